//! Family tree repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist family tree containers and their share grants.
//! - Answer "can this user see this tree" in one query.
//!
//! # Invariants
//! - A user can access a tree they own, a tree shared with them, or a public tree.
//! - Accessible listings are newest first: `created_at DESC, rowid DESC`.
//! - Deleting a tree cascades to people, relationships and shares.

use crate::model::family_tree::{
    FamilyTree, NewFamilyTree, SharePermission, TreeId, TreeShare, TreeType,
};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TREE_SELECT_SQL: &str = "SELECT
    tree_uuid,
    name,
    description,
    owner_name,
    tree_type,
    user_id,
    is_public,
    created_at,
    updated_at
FROM family_trees";

const ACCESS_FILTER_SQL: &str = "(
    user_id = ?1
    OR is_public = 1
    OR EXISTS(
        SELECT 1
        FROM tree_shares s
        WHERE s.tree_uuid = family_trees.tree_uuid
          AND s.user_id = ?1
    )
)";

/// Store contract for family trees and share grants.
pub trait FamilyTreeRepository {
    fn create_tree(&self, tree: &NewFamilyTree, owner: &str) -> RepoResult<FamilyTree>;
    fn get_tree(&self, id: TreeId) -> RepoResult<Option<FamilyTree>>;
    /// Trees owned by, shared with, or visible to `user`.
    fn list_trees_for_user(&self, user: &str) -> RepoResult<Vec<FamilyTree>>;
    fn can_access(&self, id: TreeId, user: &str) -> RepoResult<bool>;
    fn update_tree(&self, tree: &FamilyTree) -> RepoResult<FamilyTree>;
    fn delete_tree(&self, id: TreeId) -> RepoResult<()>;
    /// Inserts a grant or replaces the permission of an existing one.
    fn upsert_share(
        &self,
        tree_id: TreeId,
        user: &str,
        permission: SharePermission,
        shared_by: &str,
    ) -> RepoResult<TreeShare>;
    fn delete_share(&self, tree_id: TreeId, user: &str) -> RepoResult<()>;
    fn list_shares(&self, tree_id: TreeId) -> RepoResult<Vec<TreeShare>>;
}

/// SQLite-backed family tree repository.
pub struct SqliteFamilyTreeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilyTreeRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl FamilyTreeRepository for SqliteFamilyTreeRepository<'_> {
    fn create_tree(&self, tree: &NewFamilyTree, owner: &str) -> RepoResult<FamilyTree> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO family_trees (
                tree_uuid,
                name,
                description,
                owner_name,
                tree_type,
                user_id,
                is_public
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                tree.name.as_str(),
                tree.description.as_deref(),
                tree.owner_name.as_deref(),
                tree.tree_type.as_str(),
                owner,
                bool_to_int(tree.is_public),
            ],
        )?;
        self.get_tree(id)?
            .ok_or_else(|| RepoError::not_found("family tree", id))
    }

    fn get_tree(&self, id: TreeId) -> RepoResult<Option<FamilyTree>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TREE_SELECT_SQL} WHERE tree_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tree_row(row)?));
        }
        Ok(None)
    }

    fn list_trees_for_user(&self, user: &str) -> RepoResult<Vec<FamilyTree>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TREE_SELECT_SQL}
             WHERE {ACCESS_FILTER_SQL}
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([user])?;
        let mut trees = Vec::new();
        while let Some(row) = rows.next()? {
            trees.push(parse_tree_row(row)?);
        }
        Ok(trees)
    }

    fn can_access(&self, id: TreeId, user: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1
                    FROM family_trees
                    WHERE tree_uuid = ?2
                      AND {ACCESS_FILTER_SQL}
                );"
            ),
            params![user, id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn update_tree(&self, tree: &FamilyTree) -> RepoResult<FamilyTree> {
        let changed = self.conn.execute(
            "UPDATE family_trees
             SET
                name = ?2,
                description = ?3,
                owner_name = ?4,
                tree_type = ?5,
                is_public = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE tree_uuid = ?1;",
            params![
                tree.id.to_string(),
                tree.name.as_str(),
                tree.description.as_deref(),
                tree.owner_name.as_deref(),
                tree.tree_type.as_str(),
                bool_to_int(tree.is_public),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("family tree", tree.id));
        }
        self.get_tree(tree.id)?
            .ok_or_else(|| RepoError::not_found("family tree", tree.id))
    }

    fn delete_tree(&self, id: TreeId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM family_trees WHERE tree_uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("family tree", id));
        }
        Ok(())
    }

    fn upsert_share(
        &self,
        tree_id: TreeId,
        user: &str,
        permission: SharePermission,
        shared_by: &str,
    ) -> RepoResult<TreeShare> {
        self.conn.execute(
            "INSERT INTO tree_shares (tree_uuid, user_id, permission, shared_by)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (tree_uuid, user_id) DO UPDATE SET
                permission = excluded.permission,
                shared_by = excluded.shared_by,
                shared_at = (strftime('%s', 'now') * 1000);",
            params![tree_id.to_string(), user, permission.as_str(), shared_by],
        )?;
        let share = self.conn.query_row(
            "SELECT tree_uuid, user_id, permission, shared_by, shared_at
             FROM tree_shares
             WHERE tree_uuid = ?1
               AND user_id = ?2;",
            params![tree_id.to_string(), user],
            |row| Ok(parse_share_row(row)),
        )??;
        Ok(share)
    }

    fn delete_share(&self, tree_id: TreeId, user: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tree_shares WHERE tree_uuid = ?1 AND user_id = ?2;",
            params![tree_id.to_string(), user],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(
                "tree share",
                format!("{tree_id}/{user}"),
            ));
        }
        Ok(())
    }

    fn list_shares(&self, tree_id: TreeId) -> RepoResult<Vec<TreeShare>> {
        let mut stmt = self.conn.prepare(
            "SELECT tree_uuid, user_id, permission, shared_by, shared_at
             FROM tree_shares
             WHERE tree_uuid = ?1
             ORDER BY shared_at ASC, user_id ASC;",
        )?;
        let mut rows = stmt.query([tree_id.to_string()])?;
        let mut shares = Vec::new();
        while let Some(row) = rows.next()? {
            shares.push(parse_share_row(row)?);
        }
        Ok(shares)
    }
}

fn parse_tree_row(row: &Row<'_>) -> RepoResult<FamilyTree> {
    let id_text: String = row.get("tree_uuid")?;
    let type_text: String = row.get("tree_type")?;
    let tree_type = TreeType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid tree type `{type_text}` in family_trees.tree_type"
        ))
    })?;

    Ok(FamilyTree {
        id: parse_uuid(&id_text, "family_trees.tree_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        owner_name: row.get("owner_name")?,
        tree_type,
        user_id: row.get("user_id")?,
        is_public: parse_flag(row.get("is_public")?, "family_trees.is_public")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_share_row(row: &Row<'_>) -> RepoResult<TreeShare> {
    let tree_text: String = row.get("tree_uuid")?;
    let permission_text: String = row.get("permission")?;
    let permission = SharePermission::parse(&permission_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid permission `{permission_text}` in tree_shares.permission"
        ))
    })?;

    Ok(TreeShare {
        tree_id: parse_uuid(&tree_text, "tree_shares.tree_uuid")?,
        user_id: row.get("user_id")?,
        permission,
        shared_by: row.get("shared_by")?,
        shared_at: row.get("shared_at")?,
    })
}

//! Relationship repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist directed relationship rows and their inverse rows.
//! - Provide exact-tuple lookups and set-deletes by tuple.
//!
//! # Invariants
//! - `(from, to, type, tree)` is unique; a colliding forward insert returns
//!   `RepoError::UniqueViolation`.
//! - A forward row and its inverse row are written in one transaction.
//! - Listings are ordered by `created_at ASC, rowid ASC`.

use crate::model::family_tree::TreeId;
use crate::model::person::PersonId;
use crate::model::relationship::{
    NewRelationship, Relationship, RelationshipId, RelationshipKey, RelationshipType,
};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    relationship_uuid,
    from_person_uuid,
    to_person_uuid,
    relationship_type,
    custom_relationship_name,
    start_date,
    end_date,
    tree_uuid,
    notes,
    created_at
FROM relationships";

/// Store contract for relationship rows.
pub trait RelationshipRepository {
    /// Writes `forward`, then `inverse` when given, and returns the forward row.
    ///
    /// The inverse write is skipped silently when an identical inverse row
    /// already exists.
    fn create_relationship_pair(
        &self,
        forward: &NewRelationship,
        inverse: Option<&NewRelationship>,
    ) -> RepoResult<Relationship>;
    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>>;
    /// Finds the row matching all four tuple fields.
    fn find_exact_match(&self, key: &RelationshipKey) -> RepoResult<Option<Relationship>>;
    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()>;
    /// Deletes every row matching the tuple. Returns the number removed.
    fn delete_matching(&self, key: &RelationshipKey) -> RepoResult<usize>;
    /// Rows where the person is either endpoint.
    fn list_touching(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>>;
    fn list_for_tree(&self, tree_id: TreeId) -> RepoResult<Vec<Relationship>>;
}

/// SQLite-backed relationship repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn create_relationship_pair(
        &self,
        forward: &NewRelationship,
        inverse: Option<&NewRelationship>,
    ) -> RepoResult<Relationship> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let forward_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO relationships (
                relationship_uuid,
                from_person_uuid,
                to_person_uuid,
                relationship_type,
                custom_relationship_name,
                start_date,
                end_date,
                tree_uuid,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                forward_id.to_string(),
                forward.from_person_id.to_string(),
                forward.to_person_id.to_string(),
                forward.relationship_type.as_str(),
                forward.custom_relationship_name.as_deref(),
                forward.start_date,
                forward.end_date,
                forward.tree_id.to_string(),
                forward.notes.as_deref(),
            ],
        )?;

        if let Some(inverse) = inverse {
            tx.execute(
                "INSERT INTO relationships (
                    relationship_uuid,
                    from_person_uuid,
                    to_person_uuid,
                    relationship_type,
                    tree_uuid
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (from_person_uuid, to_person_uuid, relationship_type, tree_uuid)
                DO NOTHING;",
                params![
                    Uuid::new_v4().to_string(),
                    inverse.from_person_id.to_string(),
                    inverse.to_person_id.to_string(),
                    inverse.relationship_type.as_str(),
                    inverse.tree_id.to_string(),
                ],
            )?;
        }

        let created = load_required_relationship(&tx, forward_id)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Option<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL} WHERE relationship_uuid = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relationship_row(row)?));
        }
        Ok(None)
    }

    fn find_exact_match(&self, key: &RelationshipKey) -> RepoResult<Option<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE from_person_uuid = ?1
               AND to_person_uuid = ?2
               AND relationship_type = ?3
               AND tree_uuid = ?4
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![
            key.from_person_id.to_string(),
            key.to_person_id.to_string(),
            key.relationship_type.as_str(),
            key.tree_id.to_string(),
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_relationship_row(row)?));
        }
        Ok(None)
    }

    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM relationships WHERE relationship_uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("relationship", id));
        }
        Ok(())
    }

    fn delete_matching(&self, key: &RelationshipKey) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM relationships
             WHERE from_person_uuid = ?1
               AND to_person_uuid = ?2
               AND relationship_type = ?3
               AND tree_uuid = ?4;",
            params![
                key.from_person_id.to_string(),
                key.to_person_id.to_string(),
                key.relationship_type.as_str(),
                key.tree_id.to_string(),
            ],
        )?;
        Ok(removed)
    }

    fn list_touching(&self, person_id: PersonId) -> RepoResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE from_person_uuid = ?1
                OR to_person_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_relationship_row(row)?);
        }
        Ok(items)
    }

    fn list_for_tree(&self, tree_id: TreeId) -> RepoResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATIONSHIP_SELECT_SQL}
             WHERE tree_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([tree_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_relationship_row(row)?);
        }
        Ok(items)
    }
}

fn load_required_relationship(
    conn: &Connection,
    id: RelationshipId,
) -> RepoResult<Relationship> {
    let mut stmt = conn.prepare(&format!(
        "{RELATIONSHIP_SELECT_SQL} WHERE relationship_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => parse_relationship_row(row),
        None => Err(RepoError::not_found("relationship", id)),
    }
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let id_text: String = row.get("relationship_uuid")?;
    let from_text: String = row.get("from_person_uuid")?;
    let to_text: String = row.get("to_person_uuid")?;
    let tree_text: String = row.get("tree_uuid")?;

    let type_text: String = row.get("relationship_type")?;
    let relationship_type = RelationshipType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid relationship type `{type_text}` in relationships.relationship_type"
        ))
    })?;

    Ok(Relationship {
        id: parse_uuid(&id_text, "relationships.relationship_uuid")?,
        from_person_id: parse_uuid(&from_text, "relationships.from_person_uuid")?,
        to_person_id: parse_uuid(&to_text, "relationships.to_person_uuid")?,
        relationship_type,
        custom_relationship_name: row.get("custom_relationship_name")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        tree_id: parse_uuid(&tree_text, "relationships.tree_uuid")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}

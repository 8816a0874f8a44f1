//! Person repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and search over the `people` table.
//! - Answer existence lookups for relationship validation.
//!
//! # Invariants
//! - Listing and search are ordered by case-folded name, then `person_uuid`.
//! - Search folds case on the Rust side so non-ASCII letters match.
//! - Deleting a person cascades to relationship rows through foreign keys.

use crate::model::family_tree::TreeId;
use crate::model::person::{Gender, NewPerson, Person, PersonId};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PERSON_SELECT_SQL: &str = "SELECT
    person_uuid,
    tree_uuid,
    name,
    phone,
    email,
    address,
    birth_date,
    gender,
    occupation,
    notes,
    relationship_to_bride,
    relationship_to_groom,
    relationship_to_owner,
    position_x,
    position_y,
    is_alive,
    profile_picture,
    created_at,
    updated_at
FROM people";

/// Store contract for person records.
pub trait PersonRepository {
    /// Returns whether the scoping tree exists.
    fn tree_exists(&self, tree_id: TreeId) -> RepoResult<bool>;
    /// Inserts one person with a generated id and returns the stored row.
    fn create_person(&self, person: &NewPerson) -> RepoResult<Person>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn person_exists(&self, id: PersonId) -> RepoResult<bool>;
    fn list_people(&self, tree_id: TreeId) -> RepoResult<Vec<Person>>;
    /// Overwrites mutable fields of an existing person.
    fn update_person(&self, person: &Person) -> RepoResult<Person>;
    fn delete_person(&self, id: PersonId) -> RepoResult<()>;
    /// Case-insensitive substring match on name, email and occupation.
    fn search_people(&self, tree_id: TreeId, query: &str) -> RepoResult<Vec<Person>>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn tree_exists(&self, tree_id: TreeId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM family_trees WHERE tree_uuid = ?1);",
            [tree_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_person(&self, person: &NewPerson) -> RepoResult<Person> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO people (
                person_uuid,
                tree_uuid,
                name,
                phone,
                email,
                address,
                birth_date,
                gender,
                occupation,
                notes,
                relationship_to_bride,
                relationship_to_groom,
                relationship_to_owner,
                position_x,
                position_y,
                is_alive,
                profile_picture
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17);",
            params![
                id.to_string(),
                person.tree_id.to_string(),
                person.name.as_str(),
                person.phone.as_deref(),
                person.email.as_deref(),
                person.address.as_deref(),
                person.birth_date,
                person.gender.map(Gender::as_str),
                person.occupation.as_deref(),
                person.notes.as_deref(),
                person.relationship_to_bride.as_deref(),
                person.relationship_to_groom.as_deref(),
                person.relationship_to_owner.as_deref(),
                person.position_x,
                person.position_y,
                bool_to_int(person.is_alive),
                person.profile_picture.as_deref(),
            ],
        )?;
        load_required_person(self.conn, id)
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE person_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }
        Ok(None)
    }

    fn person_exists(&self, id: PersonId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM people WHERE person_uuid = ?1;",
                [id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_people(&self, tree_id: TreeId) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL}
             WHERE tree_uuid = ?1
             ORDER BY name COLLATE NOCASE ASC, person_uuid ASC;"
        ))?;
        let mut rows = stmt.query([tree_id.to_string()])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }

    fn update_person(&self, person: &Person) -> RepoResult<Person> {
        let changed = self.conn.execute(
            "UPDATE people
             SET
                name = ?2,
                phone = ?3,
                email = ?4,
                address = ?5,
                birth_date = ?6,
                gender = ?7,
                occupation = ?8,
                notes = ?9,
                relationship_to_bride = ?10,
                relationship_to_groom = ?11,
                relationship_to_owner = ?12,
                position_x = ?13,
                position_y = ?14,
                is_alive = ?15,
                profile_picture = ?16,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE person_uuid = ?1;",
            params![
                person.id.to_string(),
                person.name.as_str(),
                person.phone.as_deref(),
                person.email.as_deref(),
                person.address.as_deref(),
                person.birth_date,
                person.gender.map(Gender::as_str),
                person.occupation.as_deref(),
                person.notes.as_deref(),
                person.relationship_to_bride.as_deref(),
                person.relationship_to_groom.as_deref(),
                person.relationship_to_owner.as_deref(),
                person.position_x,
                person.position_y,
                bool_to_int(person.is_alive),
                person.profile_picture.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("person", person.id));
        }
        load_required_person(self.conn, person.id)
    }

    fn delete_person(&self, id: PersonId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM people WHERE person_uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("person", id));
        }
        Ok(())
    }

    fn search_people(&self, tree_id: TreeId, query: &str) -> RepoResult<Vec<Person>> {
        // SQLite LIKE and NOCASE only fold ASCII.
        let needle = query.to_lowercase();
        let mut people = self.list_people(tree_id)?;
        people.retain(|person| person.matches_search(&needle));
        Ok(people)
    }
}

fn load_required_person(conn: &Connection, id: PersonId) -> RepoResult<Person> {
    let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL} WHERE person_uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => parse_person_row(row),
        None => Err(RepoError::not_found("person", id)),
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id_text: String = row.get("person_uuid")?;
    let tree_text: String = row.get("tree_uuid")?;

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(Gender::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{value}` in people.gender"))
        })?),
        None => None,
    };

    Ok(Person {
        id: parse_uuid(&id_text, "people.person_uuid")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address: row.get("address")?,
        birth_date: row.get("birth_date")?,
        gender,
        occupation: row.get("occupation")?,
        notes: row.get("notes")?,
        relationship_to_bride: row.get("relationship_to_bride")?,
        relationship_to_groom: row.get("relationship_to_groom")?,
        relationship_to_owner: row.get("relationship_to_owner")?,
        position_x: row.get("position_x")?,
        position_y: row.get("position_y")?,
        tree_id: parse_uuid(&tree_text, "people.tree_uuid")?,
        is_alive: parse_flag(row.get("is_alive")?, "people.is_alive")?,
        profile_picture: row.get("profile_picture")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

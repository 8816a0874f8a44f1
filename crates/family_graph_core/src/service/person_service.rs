//! Person use-case service.
//!
//! # Responsibility
//! - Validate person input and scope every person to an existing tree.
//! - Provide CRUD, search and the "add family member from node" flow.
//!
//! # Invariants
//! - Input is validated before any write.
//! - A family member added from a node lands in the anchor person's tree.
//! - Relationships written here go through the same pair write as the
//!   relationship registry, so inverse rows follow the full inverse table.

use crate::model::family_tree::TreeId;
use crate::model::person::{NewPerson, Person, PersonId, PersonUpdate, PersonValidationError};
use crate::model::relationship::{NewRelationship, Relationship, RelationshipType};
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::RepoError;
use crate::service::relationship_service::write_with_inverse;
use crate::service::ErrorKind;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from person service operations.
#[derive(Debug)]
pub enum PersonServiceError {
    Validation(PersonValidationError),
    TreeNotFound(TreeId),
    PersonNotFound(PersonId),
    Repo(RepoError),
}

impl PersonServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidArgument,
            Self::TreeNotFound(_) | Self::PersonNotFound(_) => ErrorKind::NotFound,
            Self::Repo(RepoError::UniqueViolation(_)) => ErrorKind::Conflict,
            Self::Repo(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl Display for PersonServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TreeNotFound(id) => write!(f, "family tree not found: {id}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersonServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::TreeNotFound(_) | Self::PersonNotFound(_) => None,
        }
    }
}

impl From<PersonValidationError> for PersonServiceError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for PersonServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "person", id } => match id.parse() {
                Ok(person_id) => Self::PersonNotFound(person_id),
                Err(_) => Self::Repo(RepoError::NotFound {
                    entity: "person",
                    id,
                }),
            },
            other => Self::Repo(other),
        }
    }
}

/// Result of adding a new family member next to an existing person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberAdded {
    pub person: Person,
    /// Forward row from the anchor person to the new person.
    pub relationship: Relationship,
}

/// Person service over person and relationship stores.
pub struct PersonService<P: PersonRepository, R: RelationshipRepository> {
    people: P,
    relationships: R,
}

impl<P: PersonRepository, R: RelationshipRepository> PersonService<P, R> {
    pub fn new(people: P, relationships: R) -> Self {
        Self {
            people,
            relationships,
        }
    }

    pub fn create(&self, request: NewPerson) -> Result<Person, PersonServiceError> {
        let request = request.validate()?;
        if !self.people.tree_exists(request.tree_id)? {
            return Err(PersonServiceError::TreeNotFound(request.tree_id));
        }
        let person = self.people.create_person(&request)?;
        info!(
            "event=person_create module=person status=ok person_id={} tree_id={}",
            person.id, person.tree_id
        );
        Ok(person)
    }

    pub fn get(&self, id: PersonId) -> Result<Person, PersonServiceError> {
        self.people
            .get_person(id)?
            .ok_or(PersonServiceError::PersonNotFound(id))
    }

    pub fn list(&self, tree_id: TreeId) -> Result<Vec<Person>, PersonServiceError> {
        Ok(self.people.list_people(tree_id)?)
    }

    /// Applies the set fields of `update` to an existing person.
    pub fn update(
        &self,
        id: PersonId,
        update: PersonUpdate,
    ) -> Result<Person, PersonServiceError> {
        let update = update.validate()?;
        let mut person = self.get(id)?;
        update.apply_to(&mut person);
        Ok(self.people.update_person(&person)?)
    }

    /// Deletes a person. The store removes every relationship touching them.
    pub fn remove(&self, id: PersonId) -> Result<(), PersonServiceError> {
        self.people.delete_person(id)?;
        info!("event=person_remove module=person status=ok person_id={id}");
        Ok(())
    }

    /// Case-insensitive substring search over name, email and occupation.
    pub fn search(&self, tree_id: TreeId, query: &str) -> Result<Vec<Person>, PersonServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list(tree_id);
        }
        Ok(self.people.search_people(tree_id, query)?)
    }

    /// Creates a new person in the anchor's tree and links anchor -> new.
    ///
    /// `relationship_type` reads from the anchor's side: `Parent` means the
    /// anchor is the new person's parent.
    pub fn add_family_member_from_node(
        &self,
        anchor_id: PersonId,
        relationship_type: RelationshipType,
        mut new_person: NewPerson,
    ) -> Result<FamilyMemberAdded, PersonServiceError> {
        let anchor = self.get(anchor_id)?;
        new_person.tree_id = anchor.tree_id;
        let person = self.create(new_person)?;

        let request = NewRelationship::new(anchor.id, person.id, relationship_type, anchor.tree_id);
        let relationship = write_with_inverse(&self.relationships, &request)?;

        Ok(FamilyMemberAdded {
            person,
            relationship,
        })
    }
}

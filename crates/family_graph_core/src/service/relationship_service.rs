//! Relationship registry: create/remove with automatic inverse maintenance.
//!
//! # Responsibility
//! - Validate relationship requests before any write.
//! - Persist the forward row together with its derived inverse row.
//! - Remove a relationship and every matching inverse row.
//! - Offer the advisory core-family consistency check.
//!
//! # Invariants
//! - Preconditions run in order: people exist, not a self-relationship, no
//!   exact-tuple duplicate. No write happens before all of them pass.
//! - The inverse row is written only after the forward row, in the same
//!   store transaction, and carries structural fields only.
//! - `create` returns the forward row, never the inverse row.
//! - `remove` set-deletes inverse rows, so duplicate inverses cannot linger.
//! - `create` does not call `validate_relationship_consistency`.

use crate::model::family_tree::TreeId;
use crate::model::person::{Person, PersonId};
use crate::model::relationship::{
    NewRelationship, Relationship, RelationshipId, RelationshipKey, RelationshipType,
    RelationshipWithPeople,
};
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::ErrorKind;
use log::{debug, error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from relationship registry operations.
#[derive(Debug)]
pub enum RelationshipServiceError {
    /// One endpoint of a new relationship does not exist.
    PersonNotFound(PersonId),
    /// Target relationship row does not exist.
    RelationshipNotFound(RelationshipId),
    /// `from` and `to` are the same person.
    SelfRelationship(PersonId),
    /// A row with the same `(from, to, type, tree)` already exists.
    DuplicateRelationship(RelationshipKey),
    /// Store failure while performing `operation`.
    Persistence {
        operation: &'static str,
        source: RepoError,
    },
}

impl RelationshipServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PersonNotFound(_) | Self::RelationshipNotFound(_) => ErrorKind::NotFound,
            Self::SelfRelationship(_) => ErrorKind::InvalidArgument,
            Self::DuplicateRelationship(_) => ErrorKind::Conflict,
            Self::Persistence { .. } => ErrorKind::PersistenceFailure,
        }
    }

    fn persistence(operation: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| Self::Persistence { operation, source }
    }
}

impl Display for RelationshipServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::RelationshipNotFound(id) => write!(f, "relationship not found: {id}"),
            Self::SelfRelationship(id) => {
                write!(f, "person {id} cannot have a relationship with themselves")
            }
            Self::DuplicateRelationship(key) => write!(
                f,
                "relationship already exists: {} -[{}]-> {} in tree {}",
                key.from_person_id, key.relationship_type, key.to_person_id, key.tree_id
            ),
            Self::Persistence { operation, .. } => write!(f, "failed to {operation}"),
        }
    }
}

impl Error for RelationshipServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Relationship registry over person and relationship stores.
pub struct RelationshipService<P: PersonRepository, R: RelationshipRepository> {
    people: P,
    relationships: R,
}

impl<P: PersonRepository, R: RelationshipRepository> RelationshipService<P, R> {
    pub fn new(people: P, relationships: R) -> Self {
        Self {
            people,
            relationships,
        }
    }

    /// Creates a relationship and, when the type has one, its inverse.
    ///
    /// # Contract
    /// - `PersonNotFound` when either endpoint is unknown.
    /// - `SelfRelationship` when both endpoints are the same person.
    /// - `DuplicateRelationship` when the exact tuple already exists, also
    ///   when a concurrent writer wins the race.
    /// - Returns the forward row.
    pub fn create(
        &self,
        request: NewRelationship,
    ) -> Result<Relationship, RelationshipServiceError> {
        // Existence lookups are independent; both must finish before any write.
        let from_exists = self
            .people
            .person_exists(request.from_person_id)
            .map_err(RelationshipServiceError::persistence("look up person"))?;
        let to_exists = self
            .people
            .person_exists(request.to_person_id)
            .map_err(RelationshipServiceError::persistence("look up person"))?;
        if !from_exists {
            return Err(RelationshipServiceError::PersonNotFound(
                request.from_person_id,
            ));
        }
        if !to_exists {
            return Err(RelationshipServiceError::PersonNotFound(request.to_person_id));
        }

        if request.from_person_id == request.to_person_id {
            return Err(RelationshipServiceError::SelfRelationship(
                request.from_person_id,
            ));
        }

        let key = request.key();
        let existing = self
            .relationships
            .find_exact_match(&key)
            .map_err(RelationshipServiceError::persistence("look up relationship"))?;
        if existing.is_some() {
            return Err(RelationshipServiceError::DuplicateRelationship(key));
        }

        match write_with_inverse(&self.relationships, &request) {
            Ok(created) => Ok(created),
            Err(RepoError::UniqueViolation(_)) => {
                Err(RelationshipServiceError::DuplicateRelationship(key))
            }
            Err(source) => Err(RelationshipServiceError::Persistence {
                operation: "create relationship",
                source,
            }),
        }
    }

    /// Removes a relationship and every row matching its inverse tuple.
    pub fn remove(&self, id: RelationshipId) -> Result<(), RelationshipServiceError> {
        let relationship = self
            .relationships
            .get_relationship(id)
            .map_err(RelationshipServiceError::persistence("delete relationship"))?
            .ok_or(RelationshipServiceError::RelationshipNotFound(id))?;

        let result = self.relationships.delete_relationship(id).and_then(|()| {
            match relationship.key().inverse() {
                Some(inverse_key) => self.relationships.delete_matching(&inverse_key),
                None => Ok(0),
            }
        });

        match result {
            Ok(inverse_removed) => {
                info!(
                    "event=relationship_remove module=relationship status=ok relationship_id={id} type={} inverse_removed={inverse_removed}",
                    relationship.relationship_type
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    "event=relationship_remove module=relationship status=error relationship_id={id} error={source}"
                );
                Err(RelationshipServiceError::Persistence {
                    operation: "delete relationship",
                    source,
                })
            }
        }
    }

    /// Returns `false` when `proposed` would contradict an existing edge
    /// between `from` and `to`.
    ///
    /// Edges in both directions count. Advisory only: callers that want the
    /// rule enforced must call this before `create`.
    pub fn validate_relationship_consistency(
        &self,
        from: PersonId,
        to: PersonId,
        proposed: RelationshipType,
    ) -> Result<bool, RelationshipServiceError> {
        let touching = self
            .relationships
            .list_touching(from)
            .map_err(RelationshipServiceError::persistence("list relationships"))?;

        let conflicting = touching.iter().find(|existing| {
            existing.connects(from, to)
                && RelationshipType::conflicts_with(existing.relationship_type, proposed)
        });
        if let Some(existing) = conflicting {
            debug!(
                "event=relationship_consistency module=relationship status=conflict existing_type={} proposed_type={proposed}",
                existing.relationship_type
            );
            return Ok(false);
        }
        Ok(true)
    }

    pub fn get(&self, id: RelationshipId) -> Result<Relationship, RelationshipServiceError> {
        self.relationships
            .get_relationship(id)
            .map_err(RelationshipServiceError::persistence("load relationship"))?
            .ok_or(RelationshipServiceError::RelationshipNotFound(id))
    }

    /// Lists every relationship of a tree with both endpoints attached.
    pub fn list_for_tree(
        &self,
        tree_id: TreeId,
    ) -> Result<Vec<RelationshipWithPeople>, RelationshipServiceError> {
        let rows = self
            .relationships
            .list_for_tree(tree_id)
            .map_err(RelationshipServiceError::persistence("list relationships"))?;
        let people = self
            .people
            .list_people(tree_id)
            .map_err(RelationshipServiceError::persistence("list relationships"))?;
        let mut cache: HashMap<PersonId, Person> =
            people.into_iter().map(|person| (person.id, person)).collect();
        self.attach_people(rows, &mut cache)
    }

    /// Lists relationships where the person is either endpoint.
    pub fn list_for_person(
        &self,
        person_id: PersonId,
    ) -> Result<Vec<RelationshipWithPeople>, RelationshipServiceError> {
        let rows = self
            .relationships
            .list_touching(person_id)
            .map_err(RelationshipServiceError::persistence("list relationships"))?;
        self.attach_people(rows, &mut HashMap::new())
    }

    fn attach_people(
        &self,
        rows: Vec<Relationship>,
        cache: &mut HashMap<PersonId, Person>,
    ) -> Result<Vec<RelationshipWithPeople>, RelationshipServiceError> {
        let mut items = Vec::with_capacity(rows.len());
        for relationship in rows {
            let from_person = self.cached_person(relationship.from_person_id, cache)?;
            let to_person = self.cached_person(relationship.to_person_id, cache)?;
            items.push(RelationshipWithPeople {
                relationship,
                from_person,
                to_person,
            });
        }
        Ok(items)
    }

    fn cached_person(
        &self,
        id: PersonId,
        cache: &mut HashMap<PersonId, Person>,
    ) -> Result<Person, RelationshipServiceError> {
        if let Some(person) = cache.get(&id) {
            return Ok(person.clone());
        }
        let person = self
            .people
            .get_person(id)
            .map_err(RelationshipServiceError::persistence("list relationships"))?
            .ok_or_else(|| RelationshipServiceError::Persistence {
                operation: "list relationships",
                source: RepoError::not_found("person", id),
            })?;
        cache.insert(id, person.clone());
        Ok(person)
    }
}

/// Writes `request` and its derived inverse row through `repo`.
///
/// Shared by every path that creates relationships so the inverse table is
/// applied the same way everywhere.
pub(crate) fn write_with_inverse<R: RelationshipRepository>(
    repo: &R,
    request: &NewRelationship,
) -> RepoResult<Relationship> {
    let inverse = request.inverse();
    match repo.create_relationship_pair(request, inverse.as_ref()) {
        Ok(created) => {
            info!(
                "event=relationship_create module=relationship status=ok relationship_id={} type={} inverse_type={} tree_id={}",
                created.id,
                created.relationship_type,
                inverse
                    .as_ref()
                    .map_or("none", |row| row.relationship_type.as_str()),
                created.tree_id
            );
            Ok(created)
        }
        Err(err) => {
            error!(
                "event=relationship_create module=relationship status=error type={} tree_id={} error={err}",
                request.relationship_type, request.tree_id
            );
            Err(err)
        }
    }
}

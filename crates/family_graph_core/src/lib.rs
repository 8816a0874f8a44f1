//! Core domain logic for family and social relationship graphs.
//! This crate is the single source of truth for relationship invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, GraphConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::family_tree::{
    FamilyInsights, FamilyTree, FamilyTreeStats, FamilyTreeUpdate, NewFamilyTree,
    SharePermission, TreeId, TreeShare, TreeType, UserId,
};
pub use model::person::{Gender, NewPerson, Person, PersonId, PersonUpdate, PersonValidationError};
pub use model::relationship::{
    NewRelationship, Relationship, RelationshipCategory, RelationshipId, RelationshipKey,
    RelationshipType, RelationshipWithPeople,
};
pub use repo::family_tree_repo::{FamilyTreeRepository, SqliteFamilyTreeRepository};
pub use repo::person_repo::{PersonRepository, SqlitePersonRepository};
pub use repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
pub use repo::{RepoError, RepoResult};
pub use service::family_tree_service::{FamilyTreeService, FamilyTreeServiceError};
pub use service::person_service::{FamilyMemberAdded, PersonService, PersonServiceError};
pub use service::relationship_service::{RelationshipService, RelationshipServiceError};
pub use service::ErrorKind;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce the relationship, person and tree invariants above storage.
//! - Keep transport layers decoupled from storage details.
//!
//! # Invariants
//! - Services never bypass repository contracts.
//! - Every service error maps to exactly one `ErrorKind`.

pub mod family_tree_service;
pub mod person_service;
pub mod relationship_service;

/// Caller-facing classification of service failures.
///
/// A transport layer maps these to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced person, relationship or tree does not exist.
    NotFound,
    /// Input is rejected before any write.
    InvalidArgument,
    /// The write would duplicate an existing record.
    Conflict,
    /// The store failed; the message is generic.
    PersistenceFailure,
}

//! Domain model for family and social relationship graphs.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Own the relationship-type algebra (inverse and conflict tables).
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - People and relationships are scoped by exactly one `TreeId`.

pub mod family_tree;
pub mod person;
pub mod relationship;

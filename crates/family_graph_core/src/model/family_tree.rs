//! Family tree container model.
//!
//! # Responsibility
//! - Define the scoping container for people and relationships.
//! - Define share grants and the derived statistics read models.
//!
//! # Invariants
//! - Every person and relationship belongs to exactly one tree.
//! - At most one share grant exists per `(tree_id, user_id)`.

use crate::model::person::Person;
use crate::model::relationship::RelationshipType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable family tree identifier.
pub type TreeId = Uuid;

/// Opaque user identifier resolved by the caller's identity provider.
pub type UserId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreeType {
    #[default]
    FamilyTree,
    WeddingGuests,
    SocialNetwork,
    Custom,
}

impl TreeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FamilyTree => "FAMILY_TREE",
            Self::WeddingGuests => "WEDDING_GUESTS",
            Self::SocialNetwork => "SOCIAL_NETWORK",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FAMILY_TREE" => Some(Self::FamilyTree),
            "WEDDING_GUESTS" => Some(Self::WeddingGuests),
            "SOCIAL_NETWORK" => Some(Self::SocialNetwork),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Access level granted to a user a tree is shared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharePermission {
    View,
    Edit,
    Admin,
}

impl SharePermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Edit => "EDIT",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VIEW" => Some(Self::View),
            "EDIT" => Some(Self::Edit),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Persisted family tree record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    pub id: TreeId,
    pub name: String,
    pub description: Option<String>,
    pub owner_name: Option<String>,
    pub tree_type: TreeType,
    /// Owning user.
    pub user_id: UserId,
    pub is_public: bool,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

/// Creation request for a family tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamilyTree {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub tree_type: TreeType,
    #[serde(default)]
    pub is_public: bool,
}

impl NewFamilyTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            owner_name: None,
            tree_type: TreeType::default(),
            is_public: false,
        }
    }
}

/// Partial update for a family tree. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyTreeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_name: Option<String>,
    pub tree_type: Option<TreeType>,
    pub is_public: Option<bool>,
}

/// Share grant of one tree to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeShare {
    pub tree_id: TreeId,
    pub user_id: UserId,
    pub permission: SharePermission,
    pub shared_by: UserId,
    /// Epoch ms.
    pub shared_at: i64,
}

/// Aggregate counters over one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTreeStats {
    pub total_people: usize,
    pub total_relationships: usize,
    pub generations: usize,
    pub average_relationships_per_person: f64,
    /// Only types present in the tree appear as keys.
    pub relationship_type_breakdown: BTreeMap<RelationshipType, usize>,
}

/// Person-centric highlights over one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyInsights {
    pub largest_generation: usize,
    pub oldest_person: Option<Person>,
    pub youngest_person: Option<Person>,
    pub most_connected_person: Option<Person>,
    pub family_size: usize,
    pub average_age: Option<f64>,
}

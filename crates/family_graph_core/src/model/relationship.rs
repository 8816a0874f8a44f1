//! Relationship domain model and relationship-type algebra.
//!
//! # Responsibility
//! - Define the closed `RelationshipType` enumeration and its storage codes.
//! - Own the inverse table and the core-family conflict table.
//! - Define directed relationship rows and their exact-tuple key.
//!
//! # Invariants
//! - `inverse_of(inverse_of(t)) == Some(t)` for every type with an inverse.
//! - `conflicts_with` is symmetric and irreflexive.
//! - A relationship never points from a person to the same person.
//! - Inverse rows carry structural fields only (people, type, tree).

use crate::model::family_tree::TreeId;
use crate::model::person::{Person, PersonId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable relationship row identifier.
pub type RelationshipId = Uuid;

/// Closed set of relationship kinds between two people.
///
/// Serialized and stored as SCREAMING_SNAKE codes (`PARENT`, `MOTHER_IN_LAW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Parent,
    Child,
    Sibling,
    Spouse,
    Grandparent,
    Grandchild,
    GreatGrandparent,
    GreatGrandchild,
    Aunt,
    Uncle,
    Niece,
    Nephew,
    GreatAunt,
    GreatUncle,
    GreatNiece,
    GreatNephew,
    Cousin,
    MotherInLaw,
    FatherInLaw,
    DaughterInLaw,
    SonInLaw,
    SisterInLaw,
    BrotherInLaw,
    Stepparent,
    Stepchild,
    Stepsibling,
    HalfSibling,
    AdoptedParent,
    AdoptedChild,
    Godparent,
    Godchild,
    CloseFriend,
    FamilyFriend,
    Mentor,
    Mentee,
    /// Free-form relationship described by `custom_relationship_name`.
    Custom,
}

/// Coarse grouping of relationship types, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipCategory {
    DirectFamily,
    ExtendedFamily,
    InLaw,
    StepHalfAdoptive,
    Social,
    Custom,
}

use RelationshipType as T;

/// Forward type to inverse type. Types missing here have no inverse.
const INVERSE_TABLE: &[(RelationshipType, RelationshipType)] = &[
    (T::Parent, T::Child),
    (T::Child, T::Parent),
    (T::Sibling, T::Sibling),
    (T::Spouse, T::Spouse),
    (T::Grandparent, T::Grandchild),
    (T::Grandchild, T::Grandparent),
    (T::GreatGrandparent, T::GreatGrandchild),
    (T::GreatGrandchild, T::GreatGrandparent),
    (T::Aunt, T::Niece),
    (T::Uncle, T::Nephew),
    (T::Niece, T::Aunt),
    (T::Nephew, T::Uncle),
    (T::GreatAunt, T::GreatNiece),
    (T::GreatUncle, T::GreatNephew),
    (T::GreatNiece, T::GreatAunt),
    (T::GreatNephew, T::GreatUncle),
    (T::Cousin, T::Cousin),
    (T::MotherInLaw, T::DaughterInLaw),
    (T::FatherInLaw, T::SonInLaw),
    (T::DaughterInLaw, T::MotherInLaw),
    (T::SonInLaw, T::FatherInLaw),
    (T::SisterInLaw, T::SisterInLaw),
    (T::BrotherInLaw, T::BrotherInLaw),
    (T::Stepparent, T::Stepchild),
    (T::Stepchild, T::Stepparent),
    (T::Stepsibling, T::Stepsibling),
    (T::HalfSibling, T::HalfSibling),
    (T::AdoptedParent, T::AdoptedChild),
    (T::AdoptedChild, T::AdoptedParent),
    (T::Godparent, T::Godchild),
    (T::Godchild, T::Godparent),
    (T::CloseFriend, T::CloseFriend),
    (T::FamilyFriend, T::FamilyFriend),
    (T::Mentor, T::Mentee),
    (T::Mentee, T::Mentor),
];

/// Ordered `(existing, proposed)` pairs that cannot coexist between the same
/// two people. Only the core-family block is defined.
const CONFLICT_TABLE: &[(RelationshipType, RelationshipType)] = &[
    (T::Parent, T::Child),
    (T::Parent, T::Sibling),
    (T::Parent, T::Spouse),
    (T::Child, T::Parent),
    (T::Child, T::Sibling),
    (T::Child, T::Spouse),
    (T::Spouse, T::Parent),
    (T::Spouse, T::Child),
    (T::Spouse, T::Sibling),
    (T::Sibling, T::Parent),
    (T::Sibling, T::Child),
    (T::Sibling, T::Spouse),
];

impl RelationshipType {
    /// Every variant, in declaration order.
    pub const ALL: [RelationshipType; 36] = [
        T::Parent,
        T::Child,
        T::Sibling,
        T::Spouse,
        T::Grandparent,
        T::Grandchild,
        T::GreatGrandparent,
        T::GreatGrandchild,
        T::Aunt,
        T::Uncle,
        T::Niece,
        T::Nephew,
        T::GreatAunt,
        T::GreatUncle,
        T::GreatNiece,
        T::GreatNephew,
        T::Cousin,
        T::MotherInLaw,
        T::FatherInLaw,
        T::DaughterInLaw,
        T::SonInLaw,
        T::SisterInLaw,
        T::BrotherInLaw,
        T::Stepparent,
        T::Stepchild,
        T::Stepsibling,
        T::HalfSibling,
        T::AdoptedParent,
        T::AdoptedChild,
        T::Godparent,
        T::Godchild,
        T::CloseFriend,
        T::FamilyFriend,
        T::Mentor,
        T::Mentee,
        T::Custom,
    ];

    /// Returns the type the other person holds towards this one, if defined.
    ///
    /// `A --PARENT--> B` implies `B --CHILD--> A`. Self-inverse types such as
    /// `SIBLING` map to themselves. `CUSTOM` has no inverse.
    pub fn inverse_of(self) -> Option<RelationshipType> {
        INVERSE_TABLE
            .iter()
            .find(|(forward, _)| *forward == self)
            .map(|(_, inverse)| *inverse)
    }

    /// Returns whether this type is its own inverse.
    pub fn is_self_inverse(self) -> bool {
        self.inverse_of() == Some(self)
    }

    /// Returns whether `proposed` contradicts an `existing` relationship
    /// between the same two people.
    ///
    /// Only `PARENT`, `CHILD`, `SIBLING` and `SPOUSE` are mutually exclusive;
    /// every other pair is accepted.
    pub fn conflicts_with(existing: RelationshipType, proposed: RelationshipType) -> bool {
        CONFLICT_TABLE.contains(&(existing, proposed))
    }

    pub fn category(self) -> RelationshipCategory {
        match self {
            T::Parent | T::Child | T::Sibling | T::Spouse => RelationshipCategory::DirectFamily,
            T::Grandparent
            | T::Grandchild
            | T::GreatGrandparent
            | T::GreatGrandchild
            | T::Aunt
            | T::Uncle
            | T::Niece
            | T::Nephew
            | T::GreatAunt
            | T::GreatUncle
            | T::GreatNiece
            | T::GreatNephew
            | T::Cousin => RelationshipCategory::ExtendedFamily,
            T::MotherInLaw
            | T::FatherInLaw
            | T::DaughterInLaw
            | T::SonInLaw
            | T::SisterInLaw
            | T::BrotherInLaw => RelationshipCategory::InLaw,
            T::Stepparent
            | T::Stepchild
            | T::Stepsibling
            | T::HalfSibling
            | T::AdoptedParent
            | T::AdoptedChild => RelationshipCategory::StepHalfAdoptive,
            T::Godparent
            | T::Godchild
            | T::CloseFriend
            | T::FamilyFriend
            | T::Mentor
            | T::Mentee => RelationshipCategory::Social,
            T::Custom => RelationshipCategory::Custom,
        }
    }

    /// Storage and wire code, e.g. `GREAT_GRANDPARENT`.
    pub fn as_str(self) -> &'static str {
        match self {
            T::Parent => "PARENT",
            T::Child => "CHILD",
            T::Sibling => "SIBLING",
            T::Spouse => "SPOUSE",
            T::Grandparent => "GRANDPARENT",
            T::Grandchild => "GRANDCHILD",
            T::GreatGrandparent => "GREAT_GRANDPARENT",
            T::GreatGrandchild => "GREAT_GRANDCHILD",
            T::Aunt => "AUNT",
            T::Uncle => "UNCLE",
            T::Niece => "NIECE",
            T::Nephew => "NEPHEW",
            T::GreatAunt => "GREAT_AUNT",
            T::GreatUncle => "GREAT_UNCLE",
            T::GreatNiece => "GREAT_NIECE",
            T::GreatNephew => "GREAT_NEPHEW",
            T::Cousin => "COUSIN",
            T::MotherInLaw => "MOTHER_IN_LAW",
            T::FatherInLaw => "FATHER_IN_LAW",
            T::DaughterInLaw => "DAUGHTER_IN_LAW",
            T::SonInLaw => "SON_IN_LAW",
            T::SisterInLaw => "SISTER_IN_LAW",
            T::BrotherInLaw => "BROTHER_IN_LAW",
            T::Stepparent => "STEPPARENT",
            T::Stepchild => "STEPCHILD",
            T::Stepsibling => "STEPSIBLING",
            T::HalfSibling => "HALF_SIBLING",
            T::AdoptedParent => "ADOPTED_PARENT",
            T::AdoptedChild => "ADOPTED_CHILD",
            T::Godparent => "GODPARENT",
            T::Godchild => "GODCHILD",
            T::CloseFriend => "CLOSE_FRIEND",
            T::FamilyFriend => "FAMILY_FRIEND",
            T::Mentor => "MENTOR",
            T::Mentee => "MENTEE",
            T::Custom => "CUSTOM",
        }
    }

    /// Parses a storage code produced by `as_str`.
    pub fn parse(value: &str) -> Option<RelationshipType> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == value)
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact-tuple identity of a relationship row.
///
/// Two rows with the same key are duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationshipKey {
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub relationship_type: RelationshipType,
    pub tree_id: TreeId,
}

impl RelationshipKey {
    /// Key of the row the inverse relationship would occupy, if any.
    pub fn inverse(&self) -> Option<RelationshipKey> {
        self.relationship_type
            .inverse_of()
            .map(|inverse_type| RelationshipKey {
                from_person_id: self.to_person_id,
                to_person_id: self.from_person_id,
                relationship_type: inverse_type,
                tree_id: self.tree_id,
            })
    }
}

/// Persisted directed relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub relationship_type: RelationshipType,
    pub custom_relationship_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tree_id: TreeId,
    pub notes: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

impl Relationship {
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            from_person_id: self.from_person_id,
            to_person_id: self.to_person_id,
            relationship_type: self.relationship_type,
            tree_id: self.tree_id,
        }
    }

    /// Returns the person on the other end, when `person_id` is an endpoint.
    pub fn other_person(&self, person_id: PersonId) -> Option<PersonId> {
        if person_id == self.from_person_id {
            Some(self.to_person_id)
        } else if person_id == self.to_person_id {
            Some(self.from_person_id)
        } else {
            None
        }
    }

    /// Returns whether this row connects `a` and `b` in either direction.
    pub fn connects(&self, a: PersonId, b: PersonId) -> bool {
        self.other_person(a) == Some(b)
    }
}

/// Creation request for one directed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelationship {
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub relationship_type: RelationshipType,
    pub tree_id: TreeId,
    #[serde(default)]
    pub custom_relationship_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRelationship {
    /// Creates a request with descriptive fields unset.
    pub fn new(
        from_person_id: PersonId,
        to_person_id: PersonId,
        relationship_type: RelationshipType,
        tree_id: TreeId,
    ) -> Self {
        Self {
            from_person_id,
            to_person_id,
            relationship_type,
            tree_id,
            custom_relationship_name: None,
            start_date: None,
            end_date: None,
            notes: None,
        }
    }

    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            from_person_id: self.from_person_id,
            to_person_id: self.to_person_id,
            relationship_type: self.relationship_type,
            tree_id: self.tree_id,
        }
    }

    /// Builds the inverse request: people swapped, inverse type, same tree.
    ///
    /// Custom name, dates and notes stay on the forward row only.
    pub fn inverse(&self) -> Option<NewRelationship> {
        self.key().inverse().map(|key| {
            NewRelationship::new(
                key.from_person_id,
                key.to_person_id,
                key.relationship_type,
                key.tree_id,
            )
        })
    }
}

/// Relationship row joined with both endpoint people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipWithPeople {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub from_person: Person,
    pub to_person: Person,
}

#[cfg(test)]
mod tests {
    use super::{NewRelationship, RelationshipCategory, RelationshipType};
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn inverse_round_trips_for_every_type_with_inverse() {
        for kind in RelationshipType::ALL {
            if let Some(inverse) = kind.inverse_of() {
                assert_eq!(inverse.inverse_of(), Some(kind), "{kind} does not round-trip");
            }
        }
    }

    #[test]
    fn only_custom_lacks_an_inverse() {
        let without: Vec<_> = RelationshipType::ALL
            .into_iter()
            .filter(|kind| kind.inverse_of().is_none())
            .collect();
        assert_eq!(without, vec![RelationshipType::Custom]);
    }

    #[test]
    fn directional_pairs_map_to_expected_inverse() {
        assert_eq!(RelationshipType::Parent.inverse_of(), Some(RelationshipType::Child));
        assert_eq!(RelationshipType::Aunt.inverse_of(), Some(RelationshipType::Niece));
        assert_eq!(RelationshipType::Uncle.inverse_of(), Some(RelationshipType::Nephew));
        assert_eq!(
            RelationshipType::MotherInLaw.inverse_of(),
            Some(RelationshipType::DaughterInLaw)
        );
        assert_eq!(RelationshipType::Mentee.inverse_of(), Some(RelationshipType::Mentor));
    }

    #[test]
    fn self_inverse_types_are_detected() {
        let self_inverse: HashSet<_> = RelationshipType::ALL
            .into_iter()
            .filter(|kind| kind.is_self_inverse())
            .collect();
        let expected: HashSet<_> = [
            RelationshipType::Sibling,
            RelationshipType::Spouse,
            RelationshipType::Cousin,
            RelationshipType::SisterInLaw,
            RelationshipType::BrotherInLaw,
            RelationshipType::Stepsibling,
            RelationshipType::HalfSibling,
            RelationshipType::CloseFriend,
            RelationshipType::FamilyFriend,
        ]
        .into_iter()
        .collect();
        assert_eq!(self_inverse, expected);
    }

    #[test]
    fn core_family_types_conflict_pairwise() {
        let core = [
            RelationshipType::Parent,
            RelationshipType::Child,
            RelationshipType::Sibling,
            RelationshipType::Spouse,
        ];
        for existing in core {
            for proposed in core {
                assert_eq!(
                    RelationshipType::conflicts_with(existing, proposed),
                    existing != proposed,
                    "{existing} vs {proposed}"
                );
            }
        }
    }

    #[test]
    fn types_outside_core_family_never_conflict() {
        for existing in RelationshipType::ALL {
            for proposed in RelationshipType::ALL {
                let both_core = existing.category() == RelationshipCategory::DirectFamily
                    && proposed.category() == RelationshipCategory::DirectFamily;
                if !both_core {
                    assert!(!RelationshipType::conflicts_with(existing, proposed));
                }
            }
        }
    }

    #[test]
    fn storage_codes_parse_back() {
        for kind in RelationshipType::ALL {
            assert_eq!(RelationshipType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RelationshipType::parse("parent"), None);
    }

    #[test]
    fn serde_uses_storage_codes() {
        let json = serde_json::to_string(&RelationshipType::GreatGrandparent).unwrap();
        assert_eq!(json, "\"GREAT_GRANDPARENT\"");
        for kind in RelationshipType::ALL {
            let encoded = serde_json::to_string(&kind).unwrap();
            assert_eq!(encoded, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn inverse_request_drops_descriptive_fields() {
        let mut forward = NewRelationship::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RelationshipType::Godparent,
            Uuid::new_v4(),
        );
        forward.custom_relationship_name = Some("fairy godmother".to_string());
        forward.notes = Some("since baptism".to_string());

        let inverse = forward.inverse().unwrap();
        assert_eq!(inverse.from_person_id, forward.to_person_id);
        assert_eq!(inverse.to_person_id, forward.from_person_id);
        assert_eq!(inverse.relationship_type, RelationshipType::Godchild);
        assert_eq!(inverse.tree_id, forward.tree_id);
        assert!(inverse.custom_relationship_name.is_none());
        assert!(inverse.notes.is_none());

        let custom = NewRelationship::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RelationshipType::Custom,
            Uuid::new_v4(),
        );
        assert!(custom.inverse().is_none());
    }
}

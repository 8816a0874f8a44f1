//! Person domain model.
//!
//! # Responsibility
//! - Define the person record owned by one family tree.
//! - Validate person input before it reaches persistence.
//!
//! # Invariants
//! - `name` is non-blank and at most 255 characters after trim.
//! - `email`, when set, has a `local@domain.tld` shape.
//! - `tree_id` never changes after creation.

use crate::model::family_tree::TreeId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable person identifier.
pub type PersonId = Uuid;

pub const MAX_PERSON_NAME_CHARS: usize = 255;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
            Self::PreferNotToSay => "PREFER_NOT_TO_SAY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MALE" => Some(Self::Male),
            "FEMALE" => Some(Self::Female),
            "OTHER" => Some(Self::Other),
            "PREFER_NOT_TO_SAY" => Some(Self::PreferNotToSay),
            _ => None,
        }
    }
}

/// Validation failures for person input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// Name is blank after trim.
    EmptyName,
    /// Name exceeds `MAX_PERSON_NAME_CHARS`.
    NameTooLong { chars: usize },
    /// Email is set but malformed.
    InvalidEmail(String),
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "person name must not be blank"),
            Self::NameTooLong { chars } => write!(
                f,
                "person name has {chars} characters, at most {MAX_PERSON_NAME_CHARS} allowed"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
        }
    }
}

impl Error for PersonValidationError {}

/// Persisted person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub relationship_to_bride: Option<String>,
    pub relationship_to_groom: Option<String>,
    pub relationship_to_owner: Option<String>,
    /// Layout position on the tree canvas.
    pub position_x: f64,
    pub position_y: f64,
    pub tree_id: TreeId,
    pub is_alive: bool,
    pub profile_picture: Option<String>,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

impl Person {
    /// Returns whether name, email or occupation contains `needle`.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        contains(&self.name)
            || self.email.as_deref().is_some_and(contains)
            || self.occupation.as_deref().is_some_and(contains)
    }
}

/// Creation request for one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    pub tree_id: TreeId,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub relationship_to_bride: Option<String>,
    #[serde(default)]
    pub relationship_to_groom: Option<String>,
    #[serde(default)]
    pub relationship_to_owner: Option<String>,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default = "default_is_alive")]
    pub is_alive: bool,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

fn default_is_alive() -> bool {
    true
}

impl NewPerson {
    /// Creates a request with only the required fields set.
    pub fn new(name: impl Into<String>, tree_id: TreeId) -> Self {
        Self {
            name: name.into(),
            tree_id,
            phone: None,
            email: None,
            address: None,
            birth_date: None,
            gender: None,
            occupation: None,
            notes: None,
            relationship_to_bride: None,
            relationship_to_groom: None,
            relationship_to_owner: None,
            position_x: 0.0,
            position_y: 0.0,
            is_alive: true,
            profile_picture: None,
        }
    }

    /// Checks input invariants and returns the normalized request.
    ///
    /// Trims the name and maps an empty email to `None`.
    pub fn validate(mut self) -> Result<Self, PersonValidationError> {
        self.name = normalize_name(&self.name)?;
        self.email = normalize_email(self.email)?;
        Ok(self)
    }
}

/// Partial update for a person. `None` leaves the stored value unchanged.
///
/// An empty `email` clears the stored address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub relationship_to_bride: Option<String>,
    pub relationship_to_groom: Option<String>,
    pub relationship_to_owner: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub is_alive: Option<bool>,
    pub profile_picture: Option<String>,
}

impl PersonUpdate {
    pub fn validate(mut self) -> Result<Self, PersonValidationError> {
        if let Some(name) = self.name.as_deref() {
            self.name = Some(normalize_name(name)?);
        }
        if let Some(email) = self.email.take() {
            self.email = Some(normalize_email(Some(email))?.unwrap_or_default());
        }
        Ok(self)
    }

    /// Applies set fields onto `person`.
    pub fn apply_to(self, person: &mut Person) {
        if let Some(value) = self.name {
            person.name = value;
        }
        if self.phone.is_some() {
            person.phone = self.phone;
        }
        if let Some(value) = self.email {
            person.email = (!value.is_empty()).then_some(value);
        }
        if self.address.is_some() {
            person.address = self.address;
        }
        if self.birth_date.is_some() {
            person.birth_date = self.birth_date;
        }
        if self.gender.is_some() {
            person.gender = self.gender;
        }
        if self.occupation.is_some() {
            person.occupation = self.occupation;
        }
        if self.notes.is_some() {
            person.notes = self.notes;
        }
        if self.relationship_to_bride.is_some() {
            person.relationship_to_bride = self.relationship_to_bride;
        }
        if self.relationship_to_groom.is_some() {
            person.relationship_to_groom = self.relationship_to_groom;
        }
        if self.relationship_to_owner.is_some() {
            person.relationship_to_owner = self.relationship_to_owner;
        }
        if let Some(value) = self.position_x {
            person.position_x = value;
        }
        if let Some(value) = self.position_y {
            person.position_y = value;
        }
        if let Some(value) = self.is_alive {
            person.is_alive = value;
        }
        if self.profile_picture.is_some() {
            person.profile_picture = self.profile_picture;
        }
    }
}

fn normalize_name(value: &str) -> Result<String, PersonValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PersonValidationError::EmptyName);
    }
    let chars = trimmed.chars().count();
    if chars > MAX_PERSON_NAME_CHARS {
        return Err(PersonValidationError::NameTooLong { chars });
    }
    Ok(trimmed.to_string())
}

fn normalize_email(value: Option<String>) -> Result<Option<String>, PersonValidationError> {
    match value {
        None => Ok(None),
        Some(email) => {
            let trimmed = email.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if !EMAIL_PATTERN.is_match(trimmed) {
                return Err(PersonValidationError::InvalidEmail(trimmed.to_string()));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewPerson, Person, PersonUpdate, PersonValidationError};
    use uuid::Uuid;

    #[test]
    fn validate_trims_name_and_drops_empty_email() {
        let mut input = NewPerson::new("  Ada Lovelace ", Uuid::new_v4());
        input.email = Some("   ".to_string());
        let normalized = input.validate().unwrap();
        assert_eq!(normalized.name, "Ada Lovelace");
        assert_eq!(normalized.email, None);
    }

    #[test]
    fn validate_rejects_blank_and_oversized_names() {
        let blank = NewPerson::new(" \t", Uuid::new_v4());
        assert_eq!(blank.validate().unwrap_err(), PersonValidationError::EmptyName);

        let long = NewPerson::new("x".repeat(256), Uuid::new_v4());
        assert_eq!(
            long.validate().unwrap_err(),
            PersonValidationError::NameTooLong { chars: 256 }
        );
    }

    #[test]
    fn validate_rejects_malformed_email() {
        let mut input = NewPerson::new("Grace", Uuid::new_v4());
        input.email = Some("grace.example.com".to_string());
        assert!(matches!(
            input.validate(),
            Err(PersonValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn update_validation_only_checks_set_fields() {
        let update = PersonUpdate {
            occupation: Some("Engineer".to_string()),
            ..PersonUpdate::default()
        };
        assert!(update.validate().is_ok());

        let update = PersonUpdate {
            name: Some(String::new()),
            ..PersonUpdate::default()
        };
        assert_eq!(update.validate().unwrap_err(), PersonValidationError::EmptyName);
    }

    #[test]
    fn update_with_blank_email_clears_stored_email() {
        let mut person = sample_person();
        person.email = Some("ann@x.io".to_string());

        let update = PersonUpdate {
            email: Some("  ".to_string()),
            ..PersonUpdate::default()
        }
        .validate()
        .unwrap();
        update.apply_to(&mut person);
        assert_eq!(person.email, None);

        PersonUpdate::default().validate().unwrap().apply_to(&mut person);
        assert_eq!(person.email, None);
    }

    #[test]
    fn search_match_folds_non_ascii_case() {
        let mut person = sample_person();
        person.name = "Émile Zola".to_string();
        person.occupation = Some("Écrivain".to_string());
        assert!(person.matches_search("émile"));
        assert!(person.matches_search("écri"));
        assert!(!person.matches_search("hugo"));
    }

    fn sample_person() -> Person {
        Person {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            phone: None,
            email: None,
            address: None,
            birth_date: None,
            gender: None,
            occupation: None,
            notes: None,
            relationship_to_bride: None,
            relationship_to_groom: None,
            relationship_to_owner: None,
            position_x: 0.0,
            position_y: 0.0,
            tree_id: Uuid::new_v4(),
            is_alive: true,
            profile_picture: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}

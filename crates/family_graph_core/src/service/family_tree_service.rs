//! Family tree use-case service.
//!
//! # Responsibility
//! - Manage tree containers, their visibility and share grants.
//! - Derive statistics and insights from a tree's people and relationships.
//!
//! # Invariants
//! - Tree names are non-blank and at most 255 characters after trim.
//! - A tree the caller cannot access is reported as not found.
//! - Statistics never write.

use crate::model::family_tree::{
    FamilyInsights, FamilyTree, FamilyTreeStats, FamilyTreeUpdate, NewFamilyTree,
    SharePermission, TreeId, TreeShare,
};
use crate::model::person::Person;
use crate::model::relationship::{Relationship, RelationshipType};
use crate::repo::family_tree_repo::FamilyTreeRepository;
use crate::repo::person_repo::PersonRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::RepoError;
use crate::service::ErrorKind;
use chrono::{Datelike, NaiveDate};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_TREE_NAME_CHARS: usize = 255;

/// Errors from family tree service operations.
#[derive(Debug)]
pub enum FamilyTreeServiceError {
    /// Tree name is blank or longer than `MAX_TREE_NAME_CHARS`.
    InvalidName(String),
    TreeNotFound(TreeId),
    ShareNotFound { tree_id: TreeId, user_id: String },
    Repo(RepoError),
}

impl FamilyTreeServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_) => ErrorKind::InvalidArgument,
            Self::TreeNotFound(_) | Self::ShareNotFound { .. } => ErrorKind::NotFound,
            Self::Repo(RepoError::UniqueViolation(_)) => ErrorKind::Conflict,
            Self::Repo(_) => ErrorKind::PersistenceFailure,
        }
    }
}

impl Display for FamilyTreeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(message) => write!(f, "invalid tree name: {message}"),
            Self::TreeNotFound(id) => write!(f, "family tree not found: {id}"),
            Self::ShareNotFound { tree_id, user_id } => {
                write!(f, "tree {tree_id} is not shared with user {user_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FamilyTreeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FamilyTreeServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Family tree service over tree, person and relationship stores.
pub struct FamilyTreeService<F, P, R>
where
    F: FamilyTreeRepository,
    P: PersonRepository,
    R: RelationshipRepository,
{
    trees: F,
    people: P,
    relationships: R,
}

impl<F, P, R> FamilyTreeService<F, P, R>
where
    F: FamilyTreeRepository,
    P: PersonRepository,
    R: RelationshipRepository,
{
    pub fn new(trees: F, people: P, relationships: R) -> Self {
        Self {
            trees,
            people,
            relationships,
        }
    }

    pub fn create(
        &self,
        mut request: NewFamilyTree,
        owner: &str,
    ) -> Result<FamilyTree, FamilyTreeServiceError> {
        request.name = normalize_tree_name(&request.name)?;
        let tree = self.trees.create_tree(&request, owner)?;
        info!(
            "event=tree_create module=family_tree status=ok tree_id={} tree_type={}",
            tree.id,
            tree.tree_type.as_str()
        );
        Ok(tree)
    }

    /// Trees the user owns, was granted, or that are public. Newest first.
    pub fn list_accessible(&self, user: &str) -> Result<Vec<FamilyTree>, FamilyTreeServiceError> {
        Ok(self.trees.list_trees_for_user(user)?)
    }

    pub fn get_accessible(
        &self,
        id: TreeId,
        user: &str,
    ) -> Result<FamilyTree, FamilyTreeServiceError> {
        if !self.trees.can_access(id, user)? {
            return Err(FamilyTreeServiceError::TreeNotFound(id));
        }
        self.require_tree(id)
    }

    pub fn update(
        &self,
        id: TreeId,
        update: FamilyTreeUpdate,
    ) -> Result<FamilyTree, FamilyTreeServiceError> {
        let mut tree = self.require_tree(id)?;
        if let Some(name) = update.name.as_deref() {
            tree.name = normalize_tree_name(name)?;
        }
        if update.description.is_some() {
            tree.description = update.description;
        }
        if update.owner_name.is_some() {
            tree.owner_name = update.owner_name;
        }
        if let Some(tree_type) = update.tree_type {
            tree.tree_type = tree_type;
        }
        if let Some(is_public) = update.is_public {
            tree.is_public = is_public;
        }
        self.trees
            .update_tree(&tree)
            .map_err(|err| tree_error(id, err))
    }

    /// Deletes a tree with all its people, relationships and shares.
    pub fn remove(&self, id: TreeId) -> Result<(), FamilyTreeServiceError> {
        self.trees
            .delete_tree(id)
            .map_err(|err| tree_error(id, err))?;
        info!("event=tree_remove module=family_tree status=ok tree_id={id}");
        Ok(())
    }

    /// Grants `permission` on a tree, replacing any earlier grant.
    pub fn share(
        &self,
        tree_id: TreeId,
        user: &str,
        permission: SharePermission,
        shared_by: &str,
    ) -> Result<TreeShare, FamilyTreeServiceError> {
        self.require_tree(tree_id)?;
        let share = self
            .trees
            .upsert_share(tree_id, user, permission, shared_by)?;
        info!(
            "event=tree_share module=family_tree status=ok tree_id={tree_id} permission={}",
            permission.as_str()
        );
        Ok(share)
    }

    pub fn unshare(&self, tree_id: TreeId, user: &str) -> Result<(), FamilyTreeServiceError> {
        match self.trees.delete_share(tree_id, user) {
            Ok(()) => Ok(()),
            Err(RepoError::NotFound { .. }) => Err(FamilyTreeServiceError::ShareNotFound {
                tree_id,
                user_id: user.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn list_shares(&self, tree_id: TreeId) -> Result<Vec<TreeShare>, FamilyTreeServiceError> {
        self.require_tree(tree_id)?;
        Ok(self.trees.list_shares(tree_id)?)
    }

    pub fn stats(&self, id: TreeId) -> Result<FamilyTreeStats, FamilyTreeServiceError> {
        let (people, relationships) = self.load_contents(id)?;
        Ok(compute_stats(&people, &relationships))
    }

    /// Person highlights of a tree; ages are measured against `today`.
    pub fn insights(
        &self,
        id: TreeId,
        today: NaiveDate,
    ) -> Result<FamilyInsights, FamilyTreeServiceError> {
        let (people, relationships) = self.load_contents(id)?;
        Ok(compute_insights(people, &relationships, today))
    }

    fn require_tree(&self, id: TreeId) -> Result<FamilyTree, FamilyTreeServiceError> {
        self.trees
            .get_tree(id)?
            .ok_or(FamilyTreeServiceError::TreeNotFound(id))
    }

    fn load_contents(
        &self,
        id: TreeId,
    ) -> Result<(Vec<Person>, Vec<Relationship>), FamilyTreeServiceError> {
        self.require_tree(id)?;
        let people = self.people.list_people(id)?;
        let relationships = self.relationships.list_for_tree(id)?;
        Ok((people, relationships))
    }
}

fn tree_error(id: TreeId, err: RepoError) -> FamilyTreeServiceError {
    match err {
        RepoError::NotFound { .. } => FamilyTreeServiceError::TreeNotFound(id),
        other => FamilyTreeServiceError::Repo(other),
    }
}

fn normalize_tree_name(value: &str) -> Result<String, FamilyTreeServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FamilyTreeServiceError::InvalidName(
            "name must not be blank".to_string(),
        ));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TREE_NAME_CHARS {
        return Err(FamilyTreeServiceError::InvalidName(format!(
            "name has {chars} characters, at most {MAX_TREE_NAME_CHARS} allowed"
        )));
    }
    Ok(trimmed.to_string())
}

/// Generation estimate: every two parent/child rows (one edge plus its
/// inverse) count as one generation step, with a floor of one.
fn estimate_generations(relationships: &[Relationship]) -> usize {
    let parent_child = relationships
        .iter()
        .filter(|rel| {
            matches!(
                rel.relationship_type,
                RelationshipType::Parent | RelationshipType::Child
            )
        })
        .count();
    parent_child.div_ceil(2).max(1)
}

pub(crate) fn compute_stats(people: &[Person], relationships: &[Relationship]) -> FamilyTreeStats {
    let mut breakdown = BTreeMap::new();
    for rel in relationships {
        *breakdown.entry(rel.relationship_type).or_insert(0) += 1;
    }

    let average = if people.is_empty() {
        0.0
    } else {
        relationships.len() as f64 / people.len() as f64
    };

    FamilyTreeStats {
        total_people: people.len(),
        total_relationships: relationships.len(),
        generations: estimate_generations(relationships),
        average_relationships_per_person: average,
        relationship_type_breakdown: breakdown,
    }
}

pub(crate) fn compute_insights(
    people: Vec<Person>,
    relationships: &[Relationship],
    today: NaiveDate,
) -> FamilyInsights {
    let mut oldest: Option<(&Person, NaiveDate)> = None;
    let mut youngest: Option<(&Person, NaiveDate)> = None;
    let mut age_sum = 0i64;
    let mut dated = 0usize;

    for person in &people {
        let Some(birth) = person.birth_date else {
            continue;
        };
        // Ties keep the earlier person in listing order.
        if oldest.map_or(true, |(_, best)| birth < best) {
            oldest = Some((person, birth));
        }
        if youngest.map_or(true, |(_, best)| birth > best) {
            youngest = Some((person, birth));
        }
        age_sum += i64::from(today.year() - birth.year());
        dated += 1;
    }

    let mut most_connected: Option<(&Person, usize)> = None;
    for person in &people {
        let connections = relationships
            .iter()
            .filter(|rel| rel.other_person(person.id).is_some())
            .count();
        if most_connected.map_or(true, |(_, best)| connections > best) {
            most_connected = Some((person, connections));
        }
    }

    FamilyInsights {
        largest_generation: 1,
        oldest_person: oldest.map(|(person, _)| person.clone()),
        youngest_person: youngest.map(|(person, _)| person.clone()),
        most_connected_person: most_connected.map(|(person, _)| person.clone()),
        family_size: people.len(),
        average_age: (dated > 0).then(|| age_sum as f64 / dated as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_insights, compute_stats, normalize_tree_name, FamilyTreeServiceError};
    use crate::model::person::Person;
    use crate::model::relationship::{Relationship, RelationshipType};
    use crate::service::ErrorKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn person(name: &str, birth: Option<(i32, u32, u32)>) -> Person {
        Person {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            birth_date: birth.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            gender: None,
            occupation: None,
            notes: None,
            relationship_to_bride: None,
            relationship_to_groom: None,
            relationship_to_owner: None,
            position_x: 0.0,
            position_y: 0.0,
            tree_id: Uuid::nil(),
            is_alive: true,
            profile_picture: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn edge(from: &Person, to: &Person, relationship_type: RelationshipType) -> Relationship {
        Relationship {
            id: Uuid::new_v4(),
            from_person_id: from.id,
            to_person_id: to.id,
            relationship_type,
            custom_relationship_name: None,
            start_date: None,
            end_date: None,
            tree_id: Uuid::nil(),
            notes: None,
            created_at: 0,
        }
    }

    #[test]
    fn tree_name_is_trimmed_and_bounded() {
        assert_eq!(normalize_tree_name("  Smiths ").unwrap(), "Smiths");
        let err = normalize_tree_name("   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(normalize_tree_name(&"t".repeat(255)).is_ok());
        assert!(matches!(
            normalize_tree_name(&"t".repeat(256)),
            Err(FamilyTreeServiceError::InvalidName(_))
        ));
    }

    #[test]
    fn stats_of_empty_tree() {
        let stats = compute_stats(&[], &[]);
        assert_eq!(stats.total_people, 0);
        assert_eq!(stats.total_relationships, 0);
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.average_relationships_per_person, 0.0);
        assert!(stats.relationship_type_breakdown.is_empty());
    }

    #[test]
    fn stats_count_types_and_estimate_generations() {
        let grandma = person("Grandma", None);
        let mom = person("Mom", None);
        let kid = person("Kid", None);
        let rows = vec![
            edge(&grandma, &mom, RelationshipType::Parent),
            edge(&mom, &grandma, RelationshipType::Child),
            edge(&mom, &kid, RelationshipType::Parent),
            edge(&kid, &mom, RelationshipType::Child),
            edge(&grandma, &kid, RelationshipType::Grandparent),
        ];
        let stats = compute_stats(&[grandma, mom, kid], &rows);

        assert_eq!(stats.total_relationships, 5);
        assert_eq!(stats.generations, 2);
        assert!((stats.average_relationships_per_person - 5.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(
            stats.relationship_type_breakdown.get(&RelationshipType::Parent),
            Some(&2)
        );
        assert_eq!(
            stats.relationship_type_breakdown.get(&RelationshipType::Grandparent),
            Some(&1)
        );
        assert!(!stats
            .relationship_type_breakdown
            .contains_key(&RelationshipType::Spouse));
    }

    #[test]
    fn insights_pick_oldest_youngest_and_most_connected() {
        let ann = person("Ann", Some((1950, 3, 1)));
        let bob = person("Bob", None);
        let cid = person("Cid", Some((1990, 7, 9)));
        let dee = person("Dee", Some((1950, 3, 1)));
        let rows = vec![
            edge(&bob, &cid, RelationshipType::Sibling),
            edge(&cid, &bob, RelationshipType::Sibling),
            edge(&bob, &ann, RelationshipType::Child),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let insights = compute_insights(
            vec![ann.clone(), bob.clone(), cid.clone(), dee],
            &rows,
            today,
        );

        assert_eq!(insights.family_size, 4);
        assert_eq!(insights.largest_generation, 1);
        assert_eq!(insights.oldest_person.map(|p| p.id), Some(ann.id));
        assert_eq!(insights.youngest_person.map(|p| p.id), Some(cid.id));
        assert_eq!(insights.most_connected_person.map(|p| p.id), Some(bob.id));
        // (74 + 34 + 74) / 3
        assert_eq!(insights.average_age, Some(182.0 / 3.0));
    }

    #[test]
    fn insights_without_birth_dates() {
        let solo = person("Solo", None);
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let insights = compute_insights(vec![solo.clone()], &[], today);
        assert!(insights.oldest_person.is_none());
        assert!(insights.average_age.is_none());
        assert_eq!(insights.most_connected_person.map(|p| p.id), Some(solo.id));

        let empty = compute_insights(Vec::new(), &[], today);
        assert!(empty.most_connected_person.is_none());
        assert_eq!(empty.family_size, 0);
    }
}

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `family_graph_core` wiring against the configured store.
//! - Walk one create/list/remove cycle and print deterministic counters.

use family_graph_core::{
    FamilyTreeService, GraphConfig, NewFamilyTree, NewPerson, NewRelationship, PersonService,
    RelationshipService, RelationshipType, SqliteFamilyTreeRepository, SqlitePersonRepository,
    SqliteRelationshipRepository,
};
use std::error::Error;
use std::process::ExitCode;

const SMOKE_USER: &str = "cli-smoke";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_smoke module=cli status=error error={err}");
            eprintln!("family_graph smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = GraphConfig::from_env()?;
    config.init_logging()?;
    let conn = config.open_db()?;

    let trees = FamilyTreeService::new(
        SqliteFamilyTreeRepository::try_new(&conn)?,
        SqlitePersonRepository::try_new(&conn)?,
        SqliteRelationshipRepository::try_new(&conn)?,
    );
    let people = PersonService::new(
        SqlitePersonRepository::try_new(&conn)?,
        SqliteRelationshipRepository::try_new(&conn)?,
    );
    let registry = RelationshipService::new(
        SqlitePersonRepository::try_new(&conn)?,
        SqliteRelationshipRepository::try_new(&conn)?,
    );

    let tree = trees.create(NewFamilyTree::new("CLI smoke tree"), SMOKE_USER)?;
    let parent = people.create(NewPerson::new("Parent", tree.id))?;
    let child = people.create(NewPerson::new("Child", tree.id))?;
    let added = people.add_family_member_from_node(
        parent.id,
        RelationshipType::Parent,
        NewPerson::new("Second child", tree.id),
    )?;

    let link = registry.create(NewRelationship::new(
        parent.id,
        child.id,
        RelationshipType::Parent,
        tree.id,
    ))?;
    let consistent = registry.validate_relationship_consistency(
        child.id,
        added.person.id,
        RelationshipType::Sibling,
    )?;
    registry.create(NewRelationship::new(
        child.id,
        added.person.id,
        RelationshipType::Sibling,
        tree.id,
    ))?;

    let stats = trees.stats(tree.id)?;
    println!("family_graph_core version={}", family_graph_core::core_version());
    println!(
        "smoke people={} relationships={} generations={} sibling_consistent={consistent}",
        stats.total_people, stats.total_relationships, stats.generations
    );

    registry.remove(link.id)?;
    let remaining = registry.list_for_person(child.id)?.len();
    println!("smoke after_remove child_relationships={remaining}");

    trees.remove(tree.id)?;
    Ok(())
}

use chrono::NaiveDate;
use family_graph_core::db::open_db_in_memory;
use family_graph_core::{
    ErrorKind, FamilyTreeRepository, Gender, NewFamilyTree, NewPerson, PersonService,
    PersonServiceError, PersonUpdate, PersonValidationError, RelationshipKey,
    RelationshipRepository, RelationshipType, SqliteFamilyTreeRepository, SqlitePersonRepository,
    SqliteRelationshipRepository, TreeId,
};
use rusqlite::Connection;
use uuid::Uuid;

type People<'conn> = PersonService<SqlitePersonRepository<'conn>, SqliteRelationshipRepository<'conn>>;

fn people(conn: &Connection) -> People<'_> {
    PersonService::new(
        SqlitePersonRepository::try_new(conn).unwrap(),
        SqliteRelationshipRepository::try_new(conn).unwrap(),
    )
}

fn seed_tree(conn: &Connection, name: &str) -> TreeId {
    SqliteFamilyTreeRepository::try_new(conn)
        .unwrap()
        .create_tree(&NewFamilyTree::new(name), "owner")
        .unwrap()
        .id
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Lovelace");
    let service = people(&conn);

    let mut input = NewPerson::new("  Ada Lovelace  ", tree);
    input.email = Some("ada@example.com".to_string());
    input.birth_date = NaiveDate::from_ymd_opt(1815, 12, 10);
    input.gender = Some(Gender::Female);
    input.position_x = 120.5;
    input.is_alive = false;
    let created = service.create(input).unwrap();

    let loaded = service.get(created.id).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.name, "Ada Lovelace");
    assert_eq!(loaded.email.as_deref(), Some("ada@example.com"));
    assert_eq!(loaded.birth_date, NaiveDate::from_ymd_opt(1815, 12, 10));
    assert_eq!(loaded.gender, Some(Gender::Female));
    assert_eq!(loaded.position_x, 120.5);
    assert!(!loaded.is_alive);
}

#[test]
fn create_rejects_invalid_input_and_unknown_tree() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Validation");
    let service = people(&conn);

    let err = service.create(NewPerson::new("   ", tree)).unwrap_err();
    assert!(matches!(
        err,
        PersonServiceError::Validation(PersonValidationError::EmptyName)
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut bad_email = NewPerson::new("Grace", tree);
    bad_email.email = Some("not-an-email".to_string());
    assert_eq!(
        service.create(bad_email).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    let missing_tree = Uuid::new_v4();
    let err = service
        .create(NewPerson::new("Grace", missing_tree))
        .unwrap_err();
    assert!(matches!(err, PersonServiceError::TreeNotFound(id) if id == missing_tree));
}

#[test]
fn empty_email_is_stored_as_absent() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Emails");
    let mut input = NewPerson::new("Alan", tree);
    input.email = Some(String::new());

    let created = people(&conn).create(input).unwrap();
    assert!(created.email.is_none());
}

#[test]
fn list_is_scoped_to_tree_and_ordered_by_name() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Ordered");
    let other = seed_tree(&conn, "Other");
    let service = people(&conn);

    for name in ["Zoe", "anna", "Mila", "bob"] {
        service.create(NewPerson::new(name, tree)).unwrap();
    }
    service.create(NewPerson::new("Bert", other)).unwrap();

    let names: Vec<String> = service
        .list(tree)
        .unwrap()
        .into_iter()
        .map(|person| person.name)
        .collect();
    assert_eq!(names, vec!["anna", "bob", "Mila", "Zoe"]);
}

#[test]
fn update_changes_only_set_fields() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Updates");
    let service = people(&conn);

    let mut input = NewPerson::new("Grace Hopper", tree);
    input.occupation = Some("Mathematician".to_string());
    input.email = Some("grace@navy.mil".to_string());
    let created = service.create(input).unwrap();

    let updated = service
        .update(
            created.id,
            PersonUpdate {
                occupation: Some("Rear Admiral".to_string()),
                position_y: Some(42.0),
                ..PersonUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Grace Hopper");
    assert_eq!(updated.occupation.as_deref(), Some("Rear Admiral"));
    assert_eq!(updated.position_y, 42.0);
    assert_eq!(updated.tree_id, tree);
    assert_eq!(updated.email.as_deref(), Some("grace@navy.mil"));

    let cleared = service
        .update(
            created.id,
            PersonUpdate {
                email: Some(String::new()),
                ..PersonUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.email, None);
    assert_eq!(service.get(created.id).unwrap().email, None);

    let err = service
        .update(Uuid::new_v4(), PersonUpdate::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn remove_deletes_person_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Removal");
    let service = people(&conn);
    let created = service.create(NewPerson::new("Temp", tree)).unwrap();

    service.remove(created.id).unwrap();
    let err = service.remove(created.id).unwrap_err();
    assert!(matches!(err, PersonServiceError::PersonNotFound(id) if id == created.id));
    assert!(matches!(
        service.get(created.id),
        Err(PersonServiceError::PersonNotFound(_))
    ));
}

#[test]
fn search_matches_name_email_and_occupation_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Search");
    let service = people(&conn);

    let mut ada = NewPerson::new("Ada", tree);
    ada.occupation = Some("Analyst".to_string());
    service.create(ada).unwrap();
    let mut bob = NewPerson::new("Bob", tree);
    bob.email = Some("bob@analytics.io".to_string());
    service.create(bob).unwrap();
    service.create(NewPerson::new("Carla", tree)).unwrap();
    service.create(NewPerson::new("100% Real", tree)).unwrap();
    service.create(NewPerson::new("Émile Zola", tree)).unwrap();

    let names = |query: &str| -> Vec<String> {
        service
            .search(tree, query)
            .unwrap()
            .into_iter()
            .map(|person| person.name)
            .collect()
    };
    assert_eq!(names("ANAL"), vec!["Ada", "Bob"]);
    assert_eq!(names("carl"), vec!["Carla"]);
    assert_eq!(names("%"), vec!["100% Real"]);
    assert_eq!(names("émile"), vec!["Émile Zola"]);
    assert_eq!(names("ZOLA"), vec!["Émile Zola"]);
    assert!(names("zzz").is_empty());
    assert_eq!(names("  ").len(), 5);
}

#[test]
fn add_family_member_from_node_links_with_full_inverse_table() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Anchored");
    let other = seed_tree(&conn, "Elsewhere");
    let service = people(&conn);
    let anchor = service.create(NewPerson::new("Anchor", tree)).unwrap();

    let added = service
        .add_family_member_from_node(
            anchor.id,
            RelationshipType::Stepparent,
            NewPerson::new("Step kid", other),
        )
        .unwrap();

    assert_eq!(added.person.tree_id, tree);
    assert_eq!(added.relationship.from_person_id, anchor.id);
    assert_eq!(added.relationship.to_person_id, added.person.id);
    assert_eq!(added.relationship.relationship_type, RelationshipType::Stepparent);

    let inverse = SqliteRelationshipRepository::try_new(&conn)
        .unwrap()
        .find_exact_match(&RelationshipKey {
            from_person_id: added.person.id,
            to_person_id: anchor.id,
            relationship_type: RelationshipType::Stepchild,
            tree_id: tree,
        })
        .unwrap();
    assert!(inverse.is_some());
}

#[test]
fn add_family_member_from_unknown_anchor_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let tree = seed_tree(&conn, "Empty");
    let service = people(&conn);

    let err = service
        .add_family_member_from_node(
            Uuid::new_v4(),
            RelationshipType::Child,
            NewPerson::new("Orphan", tree),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(service.list(tree).unwrap().is_empty());
}

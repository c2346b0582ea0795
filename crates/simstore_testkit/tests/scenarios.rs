//! End-to-end scenarios against a loaded blog project.

use proptest::prelude::*;
use serde_json::json;
use simstore_core::{
    Cardinality, CoreError, Engine, EngineConfig, EntityKind, ObjectKind, ObjectRef, PropertyDefinition,
    PropertyType, Record, RecordId, ReferenceValue, SNAPSHOT_FILE,
};
use simstore_storage::InMemoryBackend;
use simstore_testkit::scenarios::{blog, blog_project, AUTHORS, POSTS};
use simstore_testkit::{
    apply_operations, operations_strategy, tree_shape_strategy, unique_value_strategy,
    ProjectFixture, TestEngine,
};
use std::collections::HashSet;

fn id(text: &str) -> RecordId {
    text.parse().unwrap()
}

#[test]
fn records_nest_under_parents() {
    let mut engine = blog(Cardinality::OneToOne);

    let article = engine.create_data_record(POSTS, Some("Article"), None).unwrap();
    assert_eq!(article.id().to_string(), "1.1");
    assert_eq!(article.depth(), 1);

    let comment = engine
        .create_data_record(POSTS, Some("Comment"), Some(&id("1.1")))
        .unwrap();
    assert_eq!(comment.id().to_string(), "2.1");
    assert_eq!(comment.depth(), 2);

    let parent = engine.get_data_record(POSTS, &id("1.1")).unwrap();
    assert_eq!(parent.children(), &[id("2.1")]);
}

#[test]
fn duplicate_unique_value_rejected() {
    let mut engine = blog(Cardinality::OneToOne);
    engine.create_data_record(POSTS, None, None).unwrap();
    engine.create_data_record(POSTS, None, None).unwrap();

    engine
        .set_property_value(ObjectKind::Data, POSTS, &id("1.1"), "email", json!("a@x.com"))
        .unwrap();
    let err = engine
        .set_property_value(ObjectKind::Data, POSTS, &id("2.1"), "email", json!("a@x.com"))
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateValue { .. }));

    let holder = engine
        .get_data_record_by_value(POSTS, "email", &json!("a@x.com"))
        .unwrap()
        .map(Record::id);
    assert_eq!(holder, Some(id("1.1")));
}

#[test]
fn one_to_one_reference_admits_one_source() {
    let mut engine = blog(Cardinality::OneToOne);
    engine.create_data_record(POSTS, Some("Article"), None).unwrap();
    engine.create_user(AUTHORS, "jdoe", "Jane", "Doe", None, &[]).unwrap();
    engine.create_user(AUTHORS, "rroe", "Rick", "Roe", None, &[]).unwrap();

    let u1 = ObjectRef::user(AUTHORS, id("1.1"));
    let u2 = ObjectRef::user(AUTHORS, id("2.1"));
    let post = ObjectRef::data(POSTS, id("1.1"));

    engine.add_reference(&u1, "authorOf", &[post.clone()]).unwrap();
    let err = engine.add_reference(&u2, "authorOf", &[post.clone()]).unwrap_err();
    assert!(matches!(err, CoreError::CardinalityViolation { .. }));

    engine.add_reference(&u1, "authorOf", &[post.clone()]).unwrap();
    let author = engine.get_reference(&post, "authorOf").unwrap().unwrap();
    assert_eq!(author.ids(), vec![id("1.1")]);
}

#[test]
fn username_lookup_finds_user() {
    let mut engine = blog(Cardinality::OneToOne);
    let user = engine.create_user(AUTHORS, "jdoe", "Jane", "Doe", None, &[]).unwrap();
    assert_eq!(user.id().to_string(), "1.1");

    let found = engine.get_user_by_username(AUTHORS, "jdoe").unwrap().unwrap();
    assert_eq!(found.id(), id("1.1"));
    assert_eq!(found.first_name(), "Jane");
    assert_eq!(found.last_name(), "Doe");
}

#[test]
fn disabled_persistence_writes_nothing() {
    let storage = tempfile::tempdir().unwrap();
    let config = EngineConfig::new().storage_dir(storage.path());

    let mut engine = Engine::new(config.clone());
    engine.create_data_store("Proj", "Posts");
    engine.create_data_record(POSTS, None, None).unwrap();
    engine.create_data_record(POSTS, None, None).unwrap();
    assert!(!engine.save().unwrap());
    assert!(!storage.path().join(SNAPSHOT_FILE).exists());

    let mut fresh = Engine::new(config);
    assert!(!fresh.load().unwrap());
    assert_eq!(fresh.sequences().current(EntityKind::DataRecord), 0);
    assert_eq!(fresh.sequences().current(EntityKind::User), 0);
    assert_eq!(fresh.sequences().current(EntityKind::Group), 0);
}

#[test]
fn save_and_load_through_files() {
    let mut engine = TestEngine::file();
    engine.load_fixture(&blog_project(Cardinality::OneToMany));
    engine.create_data_record(POSTS, Some("Article"), None).unwrap();
    engine.create_user(AUTHORS, "jdoe", "Jane", "Doe", None, &[]).unwrap();
    engine.create_group(AUTHORS, "Editors", None, &[]).unwrap();
    engine
        .add_reference(
            &ObjectRef::user(AUTHORS, id("1.1")),
            "authorOf",
            &[ObjectRef::data(POSTS, id("1.1"))],
        )
        .unwrap();
    assert!(engine.save().unwrap());

    let storage = engine.storage_dir().unwrap().to_path_buf();
    assert!(storage.join(SNAPSHOT_FILE).is_file());

    let mut fresh = Engine::new(TestEngine::file_config(&storage));
    assert!(fresh.load().unwrap());
    assert_eq!(fresh.snapshot(), engine.snapshot());

    // ids keep counting from the restored sequences
    let next = fresh.create_data_record(POSTS, None, None).unwrap();
    assert_eq!(next.id(), id("2.1"));
}

#[test]
fn reference_round_trip_restores_state() {
    let mut engine = blog(Cardinality::ManyToMany);
    for _ in 0..2 {
        engine.create_data_record(POSTS, None, None).unwrap();
    }
    engine.create_user(AUTHORS, "jdoe", "", "", None, &[]).unwrap();
    let user = ObjectRef::user(AUTHORS, id("1.1"));
    let posts = [ObjectRef::data(POSTS, id("1.1")), ObjectRef::data(POSTS, id("2.1"))];

    assert!(engine.get_reference(&user, "authorOf").unwrap().is_none());
    engine.add_reference(&user, "authorOf", &posts).unwrap();
    let Some(ReferenceValue::Many(targets)) = engine.get_reference(&user, "authorOf").unwrap() else {
        panic!("expected both posts");
    };
    assert_eq!(targets.len(), 2);

    engine.delete_reference(&user, "authorOf", &posts).unwrap();
    assert!(engine.get_reference(&user, "authorOf").unwrap().is_none());
    for post in &posts {
        assert!(engine.get_reference(post, "authorOf").unwrap().is_none());
    }
}

#[test]
fn one_to_many_reassignment_clears_prior_source() {
    let mut engine = blog(Cardinality::OneToMany);
    engine.create_data_record(POSTS, None, None).unwrap();
    engine.create_user(AUTHORS, "jdoe", "", "", None, &[]).unwrap();
    engine.create_user(AUTHORS, "rroe", "", "", None, &[]).unwrap();
    let (u1, u2) = (ObjectRef::user(AUTHORS, id("1.1")), ObjectRef::user(AUTHORS, id("2.1")));
    let post = ObjectRef::data(POSTS, id("1.1"));

    engine.add_reference(&u1, "authorOf", &[post.clone()]).unwrap();
    engine.add_reference(&u2, "authorOf", &[post.clone()]).unwrap();

    assert!(engine.get_reference(&u1, "authorOf").unwrap().is_none());
    let author = engine.get_reference(&post, "authorOf").unwrap().unwrap();
    assert_eq!(author.ids(), vec![id("2.1")]);
}

#[test]
fn title_default_and_asset_default() {
    let project = ProjectFixture::new("Proj")
        .data_store("Posts")
        .property(
            ObjectKind::Data,
            "title",
            &PropertyDefinition::new(PropertyType::Text).with_default("Untitled"),
        )
        .property(ObjectKind::Data, "cover", &PropertyDefinition::new(PropertyType::Image))
        .asset(ObjectKind::Data, "cover.png", b"png");
    let mut engine = TestEngine::with_projects(&[project]);
    let post = engine.create_data_record(POSTS, None, None).unwrap().id();

    let title = engine
        .get_property_value(ObjectKind::Data, POSTS, &post, "title")
        .unwrap();
    assert_eq!(title, json!("Untitled"));
    let cover = engine
        .get_property_value(ObjectKind::Data, POSTS, &post, "cover")
        .unwrap();
    assert_eq!(cover, json!("/property/proj/Data/proj-cover.png"));
}

#[test]
fn legacy_export_through_files() {
    let mut engine = TestEngine::file();
    engine.load_fixture(&blog_project(Cardinality::OneToOne));
    let post = engine.create_data_record(POSTS, Some("Article"), None).unwrap().id();
    engine
        .set_property_value(ObjectKind::Data, POSTS, &post, "title", json!("Hello"))
        .unwrap();

    assert_eq!(engine.export_legacy_records(POSTS).unwrap(), 1);
    let legacy = engine.read_legacy_record(POSTS, &post).unwrap();
    assert!(legacy.is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn depth_follows_parent(shape in tree_shape_strategy(40)) {
        let mut engine = blog(Cardinality::OneToOne);
        let mut created: Vec<(RecordId, u32)> = Vec::new();
        for parent in shape {
            let parent = parent.map(|i| created[i]);
            let record = engine
                .create_data_record(POSTS, None, parent.as_ref().map(|(id, _)| id))
                .unwrap();
            let expected = parent.map_or(1, |(_, depth)| depth + 1);
            prop_assert_eq!(record.depth(), expected);
            created.push((record.id(), record.depth()));
        }
    }

    #[test]
    fn ids_are_unique(ops in operations_strategy(60)) {
        let mut engine = blog(Cardinality::OneToOne);
        let records = apply_operations(&mut engine, POSTS, AUTHORS, "email", &ops);
        let distinct: HashSet<_> = records.iter().collect();
        prop_assert_eq!(distinct.len(), records.len());

        let store = engine.stores().user_store(AUTHORS).unwrap();
        let users: HashSet<_> = store.users().map(Record::id).collect();
        prop_assert_eq!(users.len(), store.users().count());
        let groups: HashSet<_> = store.groups().map(|g| g.id()).collect();
        prop_assert_eq!(groups.len(), store.groups().count());
    }

    #[test]
    fn unique_values_have_one_holder(ops in operations_strategy(60), probe in unique_value_strategy()) {
        let mut engine = blog(Cardinality::OneToOne);
        let records = apply_operations(&mut engine, POSTS, AUTHORS, "email", &ops);
        let holders = records
            .iter()
            .filter(|id| {
                engine
                    .get_property_value(ObjectKind::Data, POSTS, id, "email")
                    .map(|value| value == probe)
                    .unwrap_or(false)
            })
            .count();
        prop_assert!(holders <= 1);
    }

    #[test]
    fn save_load_round_trip(ops in operations_strategy(40)) {
        let backend = InMemoryBackend::new();
        let mut engine = TestEngine::shared(&backend);
        engine.load_fixture(&blog_project(Cardinality::OneToOne));
        apply_operations(&mut engine, POSTS, AUTHORS, "email", &ops);
        prop_assert!(engine.save().unwrap());

        let mut fresh = TestEngine::shared(&backend);
        prop_assert!(fresh.load().unwrap());
        prop_assert_eq!(fresh.snapshot(), engine.snapshot());
    }
}

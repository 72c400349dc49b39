// 엔티티 파서 / 부트스트랩 통합 테스트
//
// derive(Entity)로 선언한 엔티티를 EntityRegistry로 부트스트랩하고
// 생성된 메타데이터와 column family를 검증

use cfmap_core::consistency::{ConsistencyLevel, ConsistencyLevels};
use cfmap_core::error::{CfmapError, CfmapResult};
use cfmap_core::metadata::{CascadeType, EntityDao};
use cfmap_core::store::InMemoryStore;
use cfmap_core::{Entity, EntityRegistry, MappingConfig, PropertyType, Serializer, WideMap};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Entity, Default)]
pub struct UserBean {
    #[cfmap(id)]
    user_id: i64,
    #[cfmap(column)]
    name: String,
}

#[derive(Entity, Default)]
#[cfmap(serial_version_uid = 1)]
pub struct Bean {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    name: String,
    #[cfmap(column(name = "age_in_year"))]
    age: i64,
    #[cfmap(column, lazy)]
    friends: Vec<String>,
    #[cfmap(column)]
    followers: HashSet<String>,
    #[cfmap(column)]
    preferences: HashMap<i32, String>,
    #[cfmap(join_column(cascade = "all"))]
    creator: Option<UserBean>,
    #[cfmap(join_column)]
    linked_users: WideMap<i64, UserBean>,
    transient_note: String,
}

#[derive(Entity, Default)]
#[cfmap(table = "tweeter", consistency(read = "QUORUM", write = "ALL"))]
pub struct Tweeter {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    name: String,
    #[cfmap(column(table = "tweeter_tweets"), consistency(read = "ONE", write = "TWO"))]
    tweets: WideMap<i64, String>,
    #[cfmap(join_column(table = "tweeter_followers"))]
    followers: WideMap<i64, UserBean>,
    #[cfmap(column, counter)]
    visits: i64,
}

#[derive(Entity, Default)]
#[cfmap(column_family)]
pub struct Timeline {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    entries: WideMap<i64, String>,
}

fn bootstrap(
    store: &Arc<InMemoryStore>,
    force: bool,
    descriptors: impl IntoIterator<Item = cfmap_core::EntityDescriptor>,
) -> CfmapResult<EntityRegistry> {
    cfmap_core::logging::init_test();
    let config = MappingConfig::new("app").with_force_column_family_creation(force);
    EntityRegistry::bootstrap(config, Arc::clone(store) as Arc<dyn cfmap_core::StoreClient>, descriptors)
}

fn mapping_error(result: CfmapResult<EntityRegistry>) -> String {
    match result {
        Err(CfmapError::BeanMapping(message)) => message,
        Err(other) => panic!("expected a mapping error, got {other}"),
        Ok(_) => panic!("expected a mapping error"),
    }
}

#[test]
fn test_parse_bean() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Bean::descriptor(), UserBean::descriptor()])?;

    let meta = registry.entity_meta_of::<Bean>().unwrap();
    assert_eq!(meta.class_name(), "entity_parser_tests::Bean");
    assert_eq!(meta.column_family_name(), "Bean");
    assert_eq!(meta.serial_version_uid(), Some(1));
    assert_eq!(meta.id_meta().name(), "id");
    assert_eq!(meta.id_serializer(), Serializer::Long);
    assert!(!meta.is_column_family_direct_mapping());
    assert!(!meta.has_counter());

    // id와 transient 필드는 제외
    assert_eq!(meta.property_metas().len(), 7);
    let property_type = |name: &str| meta.property_meta(name).map(|p| p.property_type());
    assert_eq!(property_type("name"), Some(PropertyType::Simple));
    assert_eq!(property_type("age_in_year"), Some(PropertyType::Simple));
    assert_eq!(property_type("age"), None);
    assert_eq!(property_type("friends"), Some(PropertyType::LazyList));
    assert_eq!(property_type("followers"), Some(PropertyType::Set));
    assert_eq!(property_type("preferences"), Some(PropertyType::Map));
    assert_eq!(property_type("creator"), Some(PropertyType::JoinSimple));
    assert_eq!(property_type("linked_users"), Some(PropertyType::JoinWideMap));
    assert_eq!(property_type("transient_note"), None);

    let preferences = meta.property_meta("preferences").unwrap();
    assert_eq!(preferences.key_serializer(), Some(Serializer::Int));

    Ok(())
}

#[test]
fn test_join_properties_resolved() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Bean::descriptor(), UserBean::descriptor()])?;
    let meta = registry.entity_meta_of::<Bean>().unwrap();

    let creator = meta.property_meta("creator").unwrap();
    let join = creator.join_properties().unwrap();
    assert_eq!(join.target_class(), UserBean::CLASS_NAME);
    assert!(join.cascades(CascadeType::Persist));
    let join_meta = creator.require_join_meta()?;
    assert_eq!(join_meta.column_family_name(), "UserBean");
    assert_eq!(join_meta.id_meta().name(), "user_id");

    let linked = meta.property_meta("linked_users").unwrap();
    assert!(linked.join_meta().is_some());
    Ok(())
}

#[test]
fn test_entity_dao_kind() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Bean::descriptor(), UserBean::descriptor()])?;
    let meta = registry.entity_meta_of::<Bean>().unwrap();

    let Some(EntityDao::DynamicComposite(dao)) = meta.dao() else {
        panic!("regular entities use a dynamic composite DAO");
    };
    assert_eq!(dao.column_family(), "Bean");
    assert_eq!(dao.key_serializer(), Serializer::Long);
    Ok(())
}

#[test]
fn test_column_families_created_when_forced() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(
        &store,
        true,
        [Tweeter::descriptor(), UserBean::descriptor()],
    )?;
    assert_eq!(registry.len(), 2);

    assert!(store.has_column_family("tweeter"));
    assert!(store.has_column_family("tweeter_tweets"));
    assert!(store.has_column_family("tweeter_followers"));
    assert!(store.has_column_family("UserBean"));
    assert!(store.has_column_family("cfmap_counters"));
    assert_eq!(store.add_column_family_calls(), 5);
    Ok(())
}

#[test]
fn test_existing_column_families_are_reused() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    bootstrap(&store, true, [Tweeter::descriptor(), UserBean::descriptor()])?;
    let calls = store.add_column_family_calls();

    // 두 번째 세션은 생성 없이 검증만 수행
    bootstrap(&store, false, [Tweeter::descriptor(), UserBean::descriptor()])?;
    assert_eq!(store.add_column_family_calls(), calls);
    Ok(())
}

#[test]
fn test_missing_column_family_without_force() {
    let store = Arc::new(InMemoryStore::new());
    let result = bootstrap(&store, false, [UserBean::descriptor()]);
    let Err(CfmapError::InvalidColumnFamily(message)) = result else {
        panic!("expected an invalid column family error");
    };
    assert_eq!(
        message,
        "The required column family 'UserBean' does not exist for entity 'entity_parser_tests::UserBean'"
    );
    assert_eq!(store.add_column_family_calls(), 0);
}

#[test]
fn test_external_wide_map() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Tweeter::descriptor(), UserBean::descriptor()])?;
    let meta = registry.entity_meta_of::<Tweeter>().unwrap();

    let tweets = meta.property_meta("tweets").unwrap();
    assert_eq!(tweets.property_type(), PropertyType::ExternalWideMap);
    assert_eq!(tweets.external_column_family_name(), Some("tweeter_tweets"));
    let dao = tweets.external_dao().unwrap();
    assert_eq!(dao.column_family(), "tweeter_tweets");
    assert_eq!(dao.key_serializer(), Serializer::Long);
    assert_eq!(dao.value_serializer(), Serializer::Utf8);

    let followers = meta.property_meta("followers").unwrap();
    assert_eq!(followers.property_type(), PropertyType::ExternalJoinWideMap);
    let dao = followers.external_dao().unwrap();
    assert_eq!(dao.column_family(), "tweeter_followers");
    // join 대상의 id 타입으로 값을 저장
    assert_eq!(dao.value_serializer(), Serializer::Long);
    Ok(())
}

#[test]
fn test_consistency_levels_registered() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Tweeter::descriptor(), UserBean::descriptor()])?;
    let policy = registry.policy();

    assert_eq!(policy.read_level_for("tweeter"), ConsistencyLevel::Quorum);
    assert_eq!(policy.write_level_for("tweeter"), ConsistencyLevel::All);
    assert_eq!(policy.read_level_for("tweeter_tweets"), ConsistencyLevel::One);
    assert_eq!(policy.write_level_for("tweeter_tweets"), ConsistencyLevel::Two);
    // 속성 레벨이 없으면 엔티티 레벨을 상속
    assert_eq!(policy.read_level_for("tweeter_followers"), ConsistencyLevel::Quorum);
    assert_eq!(policy.read_level_for("UserBean"), ConsistencyLevel::One);

    let meta = registry.entity_meta_of::<Tweeter>().unwrap();
    assert_eq!(
        meta.consistency_levels(),
        ConsistencyLevels::new(ConsistencyLevel::Quorum, ConsistencyLevel::All)
    );
    Ok(())
}

#[test]
fn test_counter_property() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Tweeter::descriptor(), UserBean::descriptor()])?;
    let meta = registry.entity_meta_of::<Tweeter>().unwrap();

    assert!(meta.has_counter());
    assert!(meta.counter_dao().is_some());
    let visits = meta.property_meta("visits").unwrap();
    assert_eq!(visits.property_type(), PropertyType::Counter);
    let counter = visits.counter_properties().unwrap();
    assert_eq!(counter.fqcn(), Tweeter::CLASS_NAME);
    assert_eq!(counter.id_meta().name(), "id");
    Ok(())
}

#[test]
fn test_missing_join_entity() {
    let store = Arc::new(InMemoryStore::new());
    let message = mapping_error(bootstrap(&store, true, [Bean::descriptor()]));
    assert_eq!(
        message,
        "Cannot find mapping for join entity 'entity_parser_tests::UserBean'"
    );
}

#[test]
fn test_entity_registered_twice() {
    let store = Arc::new(InMemoryStore::new());
    let message = mapping_error(bootstrap(
        &store,
        true,
        [UserBean::descriptor(), UserBean::descriptor()],
    ));
    assert_eq!(
        message,
        "The entity 'entity_parser_tests::UserBean' is registered more than once"
    );
}

#[test]
fn test_direct_column_family_mapping() -> CfmapResult<()> {
    let store = Arc::new(InMemoryStore::new());
    let registry = bootstrap(&store, true, [Timeline::descriptor()])?;

    let meta = registry.entity_meta_of::<Timeline>().unwrap();
    assert!(meta.is_column_family_direct_mapping());
    assert_eq!(meta.column_family_name(), "Timeline");
    assert_eq!(meta.property_metas().len(), 1);
    assert_eq!(
        meta.property_meta("entries").map(|p| p.property_type()),
        Some(PropertyType::WideMap)
    );
    assert!(store.has_column_family("Timeline"));
    Ok(())
}

mod invalid {
    use super::*;
    use cfmap_core::EntityParser;
    use cfmap_core::consistency::ConsistencyPolicy;
    use cfmap_core::dao::CounterDao;
    use cfmap_core::StoreClient;

    #[derive(Entity, Default)]
    pub struct NoId {
        #[cfmap(column)]
        name: String,
    }

    #[derive(Entity, Default)]
    pub struct NoColumn {
        #[cfmap(id)]
        id: i64,
        name: String,
    }

    #[derive(Entity, Default)]
    pub struct TwoIds {
        #[cfmap(id)]
        id: i64,
        #[cfmap(id)]
        other_id: i64,
        #[cfmap(column)]
        name: String,
    }

    #[derive(Entity, Default)]
    pub struct DuplicateName {
        #[cfmap(id)]
        id: i64,
        #[cfmap(column)]
        name: String,
        #[cfmap(column(name = "name"))]
        label: String,
    }

    #[derive(Entity, Default)]
    pub struct ListId {
        #[cfmap(id)]
        id: Vec<String>,
        #[cfmap(column)]
        name: String,
    }

    #[derive(Entity, Default)]
    pub struct WrongCounter {
        #[cfmap(id)]
        id: i64,
        #[cfmap(column, counter)]
        visits: i32,
    }

    #[derive(Entity, Default)]
    #[cfmap(table = "bad-name!")]
    pub struct BadTable {
        #[cfmap(id)]
        id: i64,
        #[cfmap(column)]
        name: String,
    }

    #[derive(Entity, Default)]
    #[cfmap(column_family)]
    pub struct TwoWideMaps {
        #[cfmap(id)]
        id: i64,
        #[cfmap(column)]
        first: WideMap<i64, String>,
        #[cfmap(column)]
        second: WideMap<i64, String>,
    }

    #[derive(Entity, Default)]
    #[cfmap(column_family)]
    pub struct ScalarColumnFamily {
        #[cfmap(id)]
        id: i64,
        #[cfmap(column)]
        name: String,
    }

    #[derive(Entity, Default)]
    pub struct TimelineFollower {
        #[cfmap(id)]
        id: i64,
        #[cfmap(join_column)]
        timeline: Option<Timeline>,
    }

    #[derive(Entity, Default)]
    #[cfmap(table = "orphans", consistency(read = "ALL", write = "ALL"))]
    pub struct Orphan {
        #[cfmap(column)]
        name: String,
    }

    #[test]
    fn test_direct_mapping_with_two_columns() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [TwoWideMaps::descriptor()])),
            "The ColumnFamily entity 'entity_parser_tests::invalid::TwoWideMaps' should not have more than one property annotated with #[cfmap(column)]"
        );
    }

    #[test]
    fn test_direct_mapping_without_wide_map() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [ScalarColumnFamily::descriptor()])),
            "The ColumnFamily entity 'entity_parser_tests::invalid::ScalarColumnFamily' should have one and only one #[cfmap(column)]/#[cfmap(join_column)] of type WideMap"
        );
    }

    #[test]
    fn test_join_to_direct_mapping() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(
                &store,
                true,
                [TimelineFollower::descriptor(), Timeline::descriptor()],
            )),
            "The entity 'entity_parser_tests::Timeline' is a direct Column Family mapping and cannot be a join entity"
        );
    }

    #[test]
    fn test_failed_parse_registers_no_consistency() {
        let store: Arc<dyn StoreClient> = Arc::new(InMemoryStore::new());
        let policy = Arc::new(ConsistencyPolicy::default());
        let counter_dao = Arc::new(CounterDao::new(Arc::clone(&store), Arc::clone(&policy), "cfmap_counters"));
        let parser = EntityParser::new(store, Arc::clone(&policy), counter_dao);

        let mut pending_joins = Vec::new();
        assert!(parser.parse_entity(&Orphan::descriptor(), &mut pending_joins).is_err());
        assert_eq!(policy.read_level_for("orphans"), ConsistencyLevel::One);
        assert_eq!(policy.write_level_for("orphans"), ConsistencyLevel::One);
    }

    #[test]
    fn test_missing_id() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [NoId::descriptor()])),
            "The entity 'entity_parser_tests::invalid::NoId' should have at least one field with #[cfmap(id)] annotation"
        );
    }

    #[test]
    fn test_missing_column() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [NoColumn::descriptor()])),
            "The entity 'entity_parser_tests::invalid::NoColumn' should have at least one field with #[cfmap(column)] or #[cfmap(join_column)] annotations"
        );
    }

    #[test]
    fn test_two_ids() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [TwoIds::descriptor()])),
            "The entity 'entity_parser_tests::invalid::TwoIds' should have only one field with #[cfmap(id)] annotation"
        );
    }

    #[test]
    fn test_duplicate_property_name() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [DuplicateName::descriptor()])),
            "The property 'name' is already used for the entity 'entity_parser_tests::invalid::DuplicateName'"
        );
    }

    #[test]
    fn test_id_not_serializable() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [ListId::descriptor()])),
            "Value of 'id' should be Serializable"
        );
    }

    #[test]
    fn test_wrong_counter_type() {
        let store = Arc::new(InMemoryStore::new());
        assert_eq!(
            mapping_error(bootstrap(&store, true, [WrongCounter::descriptor()])),
            "Wrong counter type for the field 'visits'. Only i64 is allowed for #[cfmap(counter)] types"
        );
    }

    #[test]
    fn test_invalid_table_name() {
        let store = Arc::new(InMemoryStore::new());
        let result = bootstrap(&store, true, [BadTable::descriptor()]);
        assert!(matches!(result, Err(CfmapError::Validation(_))));
        assert_eq!(store.add_column_family_calls(), 0);
    }
}

//! derive(Entity), derive(MultiKey) 매크로 테스트

use cfmap_core::consistency::{ConsistencyLevel, ConsistencyLevels};
use cfmap_core::metadata::CascadeType;
use cfmap_core::parser::{FieldMarker, FieldShape};
use cfmap_core::value::{KeyComponent, Value, ValueKind, ValueType};
use cfmap_core::{Entity, MultiKey, WideMap};
use std::collections::{HashMap, HashSet};

#[derive(Entity, Default)]
#[cfmap(table = "users", serial_version_uid = 42, consistency(read = "quorum", write = "ALL"))]
pub struct User {
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
    #[cfmap(column)]
    nickname: Option<String>,
    #[cfmap(column)]
    avatar: Vec<u8>,
    #[cfmap(column(table = "user_tweets"), consistency(read = "ONE", write = "QUORUM"))]
    tweets: WideMap<i64, String>,
    #[cfmap(column, counter)]
    visits: i64,
    #[cfmap(join_column(cascade = "persist, merge"))]
    referrer: Option<Box<User>>,
    #[cfmap(join_column(table = "user_friends"))]
    best_friends: WideMap<i32, User>,
    cache: Vec<u8>,
}

#[derive(Entity, Default)]
pub struct Timestamped {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    created_at: i64,
}

#[derive(Entity, Default)]
#[cfmap(table = "posts")]
pub struct Post {
    #[cfmap(inherit)]
    base: Timestamped,
    #[cfmap(column)]
    title: String,
}

#[derive(Entity)]
#[cfmap(column_family)]
pub struct Timeline {
    #[cfmap(id)]
    id: i64,
    #[cfmap(column)]
    entries: WideMap<TweetKey, String>,
}

#[derive(MultiKey, Clone, Default, Debug, PartialEq)]
pub struct TweetKey {
    #[key(order = 2)]
    posted_at: i64,
    #[key(order = 1)]
    author: String,
    note: String,
}

#[test]
fn test_class_name() {
    assert_eq!(User::CLASS_NAME, "derive_entity::User");
    let descriptor = User::descriptor();
    assert_eq!(descriptor.class_name(), User::CLASS_NAME);
    assert_eq!(descriptor.simple_name(), "User");
}

#[test]
fn test_entity_attributes() {
    let descriptor = User::descriptor();
    assert_eq!(descriptor.table_name(), Some("users"));
    assert_eq!(descriptor.serial_version_uid_value(), Some(42));
    assert_eq!(
        descriptor.consistency_levels(),
        Some(ConsistencyLevels::new(ConsistencyLevel::Quorum, ConsistencyLevel::All))
    );
    assert!(!descriptor.is_column_family_direct_mapping());
    assert!(Timeline::descriptor().is_column_family_direct_mapping());
}

#[test]
fn test_transient_fields_skipped() {
    let descriptor = User::descriptor();
    let names: Vec<_> = descriptor.fields().iter().map(|f| f.field_name()).collect();
    assert_eq!(names.len(), 12);
    assert!(!names.contains(&"cache"));
}

#[test]
fn test_inferred_shapes() {
    let descriptor = User::descriptor();
    let shape = |name: &str| {
        descriptor
            .fields()
            .iter()
            .find(|f| f.field_name() == name)
            .map(|f| f.shape().clone())
            .unwrap()
    };
    assert_eq!(shape("id"), FieldShape::Scalar(ValueKind::Long));
    assert_eq!(shape("friends"), FieldShape::List(ValueKind::Text));
    assert_eq!(shape("followers"), FieldShape::Set(ValueKind::Text));
    assert_eq!(
        shape("preferences"),
        FieldShape::Map {
            key: ValueKind::Int,
            value: ValueKind::Text
        }
    );
    assert_eq!(shape("nickname"), FieldShape::Scalar(ValueKind::Text));
    assert_eq!(shape("avatar"), FieldShape::Scalar(ValueKind::Bytes));
    assert_eq!(
        shape("tweets"),
        FieldShape::WideMap {
            key: ValueKind::Long,
            key_components: None,
            value: ValueKind::Text
        }
    );
    assert_eq!(
        shape("referrer"),
        FieldShape::Scalar(ValueKind::Entity("derive_entity::User".to_string()))
    );
}

#[test]
fn test_field_markers() {
    let descriptor = User::descriptor();
    let field = |name: &str| descriptor.fields().iter().find(|f| f.field_name() == name).unwrap();

    assert_eq!(field("id").marker(), &FieldMarker::Id);
    assert_eq!(field("age").property_name(), "age_in_year");
    assert!(field("friends").is_lazy());
    assert!(field("visits").is_counter());
    assert_eq!(
        field("tweets").consistency_levels(),
        Some(ConsistencyLevels::new(ConsistencyLevel::One, ConsistencyLevel::Quorum))
    );
    let FieldMarker::Column(column) = field("tweets").marker() else {
        panic!("tweets should be a column");
    };
    assert_eq!(column.table.as_deref(), Some("user_tweets"));

    let FieldMarker::JoinColumn(join) = field("referrer").marker() else {
        panic!("referrer should be a join column");
    };
    assert_eq!(join.cascade, vec![CascadeType::Persist, CascadeType::Merge]);
    let FieldMarker::JoinColumn(join) = field("best_friends").marker() else {
        panic!("best_friends should be a join column");
    };
    assert_eq!(join.table.as_deref(), Some("user_friends"));
}

#[test]
fn test_accessors() {
    let descriptor = User::descriptor();
    let accessors = |name: &str| {
        descriptor
            .fields()
            .iter()
            .find(|f| f.field_name() == name)
            .and_then(|f| f.field_accessors().cloned())
    };

    let mut user = User::default();
    let name = accessors("name").unwrap();
    (name.setter)(&mut user, Value::Text("alice".into())).unwrap();
    assert_eq!(user.name, "alice");
    assert_eq!((name.getter)(&user).unwrap(), Some(Value::Text("alice".into())));

    let nickname = accessors("nickname").unwrap();
    assert_eq!((nickname.getter)(&user).unwrap(), None);

    let friends = accessors("friends").unwrap();
    (friends.setter)(&mut user, Value::List(vec![Value::Text("bob".into())])).unwrap();
    assert_eq!(user.friends, vec!["bob".to_string()]);

    assert!(accessors("tweets").is_none());
    assert!(accessors("referrer").is_none());
}

#[test]
fn test_inherited_fields() {
    let descriptor = Post::descriptor();
    let names: Vec<_> = descriptor.all_fields().iter().map(|f| f.field_name()).collect();
    assert_eq!(names, vec!["id", "created_at", "title"]);

    let fields = descriptor.all_fields();
    let id = fields[0].field_accessors().unwrap();
    let mut post = Post::default();
    (id.setter)(&mut post, Value::Long(9)).unwrap();
    assert_eq!(post.base.id, 9);
}

#[test]
fn test_multi_key_components() {
    assert_eq!(TweetKey::kind(), ValueKind::MultiKey("TweetKey".to_string()));
    assert_eq!(
        TweetKey::key_components(),
        Some(vec![
            KeyComponent {
                name: "author".to_string(),
                order: 1,
                kind: ValueKind::Text,
            },
            KeyComponent {
                name: "posted_at".to_string(),
                order: 2,
                kind: ValueKind::Long,
            },
        ])
    );

    let shape = Timeline::descriptor().fields()[1].shape().clone();
    let FieldShape::WideMap { key_components, .. } = shape else {
        panic!("entries should be a wide map");
    };
    assert_eq!(key_components.map(|c| c.len()), Some(2));
}

#[test]
fn test_multi_key_values() {
    let key = TweetKey {
        posted_at: 10,
        author: "alice".into(),
        note: "ignored".into(),
    };
    let value = key.into_value().unwrap();
    assert_eq!(
        value,
        Value::Components(vec![Value::Text("alice".into()), Value::Long(10)])
    );

    let decoded = TweetKey::from_value(value).unwrap();
    assert_eq!(decoded.author, "alice");
    assert_eq!(decoded.posted_at, 10);
    assert!(decoded.note.is_empty());

    assert!(TweetKey::from_value(Value::Components(vec![Value::Long(1)])).is_err());
    assert!(TweetKey::from_value(Value::Long(1)).is_err());
}

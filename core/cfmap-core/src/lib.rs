//! # cfmap — Wide-column 스토어용 엔티티 매핑 레이어
//!
//! cfmap은 Rust 구조체를 wide-column 스토어의 column family에 매핑합니다.
//! 엔티티 한 개는 row 하나에, 속성 하나는 composite 이름을 가진 column에
//! 저장됩니다.
//!
//! ## 주요 특징
//!
//! - **Composite 컬럼 코덱**: 순서가 보장되는 composite / dynamic composite 인코딩
//! - **엔티티 파서**: `#[derive(Entity)]` → [`EntityMeta`]
//! - **Column family 검증/생성**: 부트스트랩 시 스키마 확인
//! - **Wide map / counter / join**: 페이지 단위 slice 반복자
//! - **Consistency 정책**: column family별 read/write 레벨
//!
//! ## 빠른 시작
//!
//! ```rust
//! use cfmap_core::{Entity, EntityRegistry, InMemoryStore, MappingConfig, WideMap};
//! use std::sync::Arc;
//!
//! #[derive(Entity, Default)]
//! #[cfmap(table = "users")]
//! pub struct User {
//!     #[cfmap(id)]
//!     id: i64,
//!     #[cfmap(column)]
//!     name: String,
//!     #[cfmap(column)]
//!     tweets: WideMap<i64, String>,
//! }
//!
//! # fn main() -> cfmap_core::CfmapResult<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let config = MappingConfig::new("app").with_force_column_family_creation(true);
//! let registry = EntityRegistry::bootstrap(config, store, [User::descriptor()])?;
//!
//! let meta = registry.entity_meta_of::<User>().unwrap();
//! assert_eq!(meta.column_family_name(), "users");
//! assert_eq!(meta.property_metas().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## 모듈 구조
//!
//! - [`composite`]: composite 컬럼 이름과 slice 경계 생성
//! - [`parser`]: 엔티티 디스크립터 → 메타데이터
//! - [`metadata`]: [`EntityMeta`], [`PropertyMeta`]
//! - [`schema`]: column family 정의, 검증, 생성
//! - [`dao`]: column family 단위 데이터 접근
//! - [`iterator`]: wide map slice 반복자
//! - [`store`]: 스토어 클라이언트 trait과 인메모리 구현

// derive 매크로가 생성한 `cfmap_core::...` 경로를 크레이트 내부 테스트에서도 사용
extern crate self as cfmap_core;

pub mod composite;
pub mod config;
pub mod consistency;
pub mod dao;
pub mod error;
pub mod iterator;
pub mod join;
pub mod metadata;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod serializer;
pub mod store;
pub mod value;

// Logging utilities
pub mod logging;

// ===== Re-exports =====
pub use config::MappingConfig;
pub use consistency::{ConsistencyLevel, ConsistencyLevels, ConsistencyPolicy};
pub use error::{CfmapError, CfmapResult};
pub use metadata::{EntityMeta, PropertyMeta, PropertyType};
pub use parser::{Entity, EntityDescriptor, EntityParser, FieldDescriptor, FieldShape, WideMap};
pub use registry::EntityRegistry;
pub use schema::{ColumnFamilyCreator, ColumnFamilyHelper};
pub use serializer::Serializer;
pub use store::{InMemoryStore, StoreClient};
pub use value::{TimeUuid, Value, ValueKind, ValueType};

// Re-export derive macros
pub use cfmap_derive::{Entity, MultiKey};

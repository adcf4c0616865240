//! # myorm
//!
//! A small MySQL-dialect data access layer.
//!
//! ## Features
//!
//! - **Query builder**: SQL text and `?` arguments assembled side by side, see [`QueryBuilder`]
//! - **Entity mapping**: tagged struct fields ↔ columns through `#[derive(Entity)]`
//! - **Dao**: one statement per CRUD intent on the `id` column
//! - **Id generation**: per-name sequences from a single atomic update
//! - **Pooling**: `deadpool`-backed connections with a guaranteed return per operation
//! - **Statement logging**: interpolated SQL lines through a pluggable [`SqlLogger`]
//!
//! The wire protocol is not part of the crate: plug a driver in by
//! implementing [`Driver`] and [`Link`].
//!
//! ## Query Builder
//!
//! ```ignore
//! use myorm::{QueryBuilder, QueryItem};
//!
//! let mut qb = QueryBuilder::new();
//! qb.update("people")
//!     .set(&[QueryItem::pair("name", "e")])
//!     .where_and(&[QueryItem::in_list("id", vec![14_i64, 15])]);
//! let (sql, args) = qb.build()?;
//! // update people set name = ? where id in (?, ?)
//! ```
//!
//! ## Pooled ORM
//!
//! ```ignore
//! use myorm::{Entity, Orm, Pool, PoolConfig};
//!
//! #[derive(Debug, Default, Entity)]
//! struct Person {
//!     #[orm(column = "id")]
//!     id: i64,
//!     #[orm(column = "name")]
//!     name: String,
//! }
//!
//! let pool = Pool::from_driver(driver, config, PoolConfig::default())?;
//! let mut orm = Orm::new("trace-1", pool, true);
//! let ids = orm.insert("person", "person", "id", &mut [Person::default()]).await?;
//! let found: Option<Person> = orm.get_by_id("person", ids[0]).await?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod dao;
pub mod error;
pub mod id_gen;
pub mod logger;
pub mod mapper;
pub mod orm;
pub mod pool;
pub mod query_builder;
pub mod row;
pub mod value;

pub use client::{Client, Driver, ExecResult, Link};
pub use condition::{Op, QueryItem};
pub use config::{Config, PoolConfig};
pub use dao::{Dao, ID_COLUMN, QueryParams};
pub use error::{BoxError, OrmError, OrmResult};
pub use id_gen::{ID_GEN_TABLE, IdGenerator};
pub use logger::{MemoryLogger, NoopLogger, SqlLogger, TracingLogger, interpolate};
pub use mapper::{DescriptorBuilder, Entity, EntityDescriptor, FieldDescriptor, ScanTargets};
pub use orm::{Orm, OrmSession};
pub use pool::{ConnectionFactory, Pool, PoolStatus, PooledClient};
pub use query_builder::QueryBuilder;
pub use row::Row;
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "derive")]
pub use myorm_derive::Entity;

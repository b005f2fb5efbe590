//! The GraphQL schema derived from the exposed PostgreSQL schema, and the
//! service executing requests against it.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod export;
pub mod inflect;
pub mod path;
pub mod redact;
pub mod schema;
pub mod service;
pub mod tables;

pub use cache::{SchemaCache, Watcher};
pub use catalog::Catalog;
pub use error::GqlError;
pub use path::ErrorPath;
pub use schema::generate_schema;
pub use service::GraphQL;

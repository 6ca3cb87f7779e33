/// Database Module
///
/// This module provides the database side of the dump engine, organized
/// into focused submodules.
///
/// ## Architecture
///
/// - **Connection Seam** (`connection.rs`): Traits an externally supplied connection implements
/// - **Query Helpers** (`query.rs`): Single-value fetches and identifier quoting
/// - **Schema Introspection** (`schema.rs`): `CREATE TABLE` text and column metadata
///
/// ## Error Handling
///
/// All database operations use the standardized `DumpError` type for consistent error propagation.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;

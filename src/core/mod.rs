/// Core Module for sqldump
///
/// This module contains the shared infrastructure the dump engine is built
/// on: the connection seam that collaborators implement, schema
/// introspection queries and the error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DumpError, Result};

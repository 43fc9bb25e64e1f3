//! inferix common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Random-variable identifiers
//! - Schema versioning for model documents and JSON output
//! - The unified error type with stable codes
//! - Output format selection

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::VariableId;
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;

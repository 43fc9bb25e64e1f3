//! Schema versioning for model documents and JSON results.

use crate::error::{Error, Result};

/// Version written into every JSON document this workspace produces.
///
/// Bumping MAJOR means older readers must refuse the document; MINOR and
/// PATCH only add optional fields.
pub const SCHEMA_VERSION: &str = "1.0.0";

fn major(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}

/// Whether a document written with `version` can be read by this build.
pub fn is_compatible(version: &str) -> bool {
    match (major(SCHEMA_VERSION), major(version)) {
        (Some(ours), Some(theirs)) => ours == theirs,
        _ => false,
    }
}

/// Reject documents from an incompatible major version.
pub fn ensure_compatible(version: &str) -> Result<()> {
    if is_compatible(version) {
        Ok(())
    } else {
        Err(Error::SchemaMismatch {
            expected: SCHEMA_VERSION.to_string(),
            found: version.to_string(),
        })
    }
}

//! Domain-classified store failures.
//!
//! Store methods return `anyhow::Result`; these types ride inside the
//! `anyhow::Error` so callers can recover the classification by downcast.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} not found: {key}")]
pub struct NotFound {
    pub entity: &'static str,
    pub key: String,
}

impl NotFound {
    pub fn new(entity: &'static str, key: impl Into<String>) -> Self {
        Self {
            entity,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} already exists: {key}")]
pub struct Conflict {
    pub entity: &'static str,
    pub key: String,
}

impl Conflict {
    pub fn new(entity: &'static str, key: impl Into<String>) -> Self {
        Self {
            entity,
            key: key.into(),
        }
    }
}

//! Configuration types and environment access.

use std::collections::HashMap;

/// Path of the schema text shared by the decoder and encoder. Required.
pub const ENV_SCHEMA_FILENAME: &str = "ENV_SCHEMA_FILENAME";
/// Name of the field scanned for addresses. Optional.
pub const ENV_BODY_NAME: &str = "ENV_BODY_NAME";
/// Name of the field that receives the address tags. Optional.
pub const ENV_TAG_NAME: &str = "ENV_TAG_NAME";

pub const DEFAULT_BODY_FIELD: &str = "body";
pub const DEFAULT_TAG_FIELD: &str = "tags";

/// Schema files larger than this are truncated, not rejected.
pub const SCHEMA_SIZE_LIMIT_DEFAULT: u64 = 1_048_576;

/// Field names used by the tagger. Resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    /// Field scanned for address-like text.
    pub source_field: String,
    /// Field overwritten with the normalized and extended tag list.
    pub tag_field: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            source_field: DEFAULT_BODY_FIELD.to_string(),
            tag_field: DEFAULT_TAG_FIELD.to_string(),
        }
    }
}

/// Process-level settings for a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Maximum number of schema bytes read.
    pub schema_size_limit: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            schema_size_limit: SCHEMA_SIZE_LIMIT_DEFAULT,
        }
    }
}

/// Source of environment variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

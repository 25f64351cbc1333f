//! Validator tuning knobs.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Files at or above this size are processed one at a time.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Entity count above which specifications are handed to the worker pool.
pub const DEFAULT_WORKER_ENTITY_THRESHOLD: usize = 1000;

/// Lines (or records) processed per cooperative parse step.
pub const DEFAULT_PARSE_CHUNK: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub large_file_threshold_bytes: u64,
    pub worker_entity_threshold: usize,
    pub parse_chunk_lines: usize,
    /// `None` lets rayon pick one thread per core. `Some(0)` disables the pool.
    pub worker_threads: Option<usize>,
    /// Check classification/material/partOf requirements against the model
    /// instead of reporting them as present.
    pub strict_structural_requirements: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            large_file_threshold_bytes: DEFAULT_LARGE_FILE_THRESHOLD,
            worker_entity_threshold: DEFAULT_WORKER_ENTITY_THRESHOLD,
            parse_chunk_lines: DEFAULT_PARSE_CHUNK,
            worker_threads: None,
            strict_structural_requirements: false,
        }
    }
}

impl ValidatorConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

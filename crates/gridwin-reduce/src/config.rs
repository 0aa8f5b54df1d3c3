use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read reducer config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid reducer config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Execution settings for [`SlidingWindowReducer`](crate::SlidingWindowReducer).
///
/// Missing fields fall back to [`ReducerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Fill output rows on the rayon thread pool.
    pub parallel: bool,
    /// Outputs with fewer cells than this stay on the calling thread.
    pub min_parallel_cells: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        ReducerConfig {
            parallel: false,
            min_parallel_cells: 4096,
        }
    }
}

impl ReducerConfig {
    pub fn parallel(min_parallel_cells: usize) -> Self {
        ReducerConfig {
            parallel: true,
            min_parallel_cells,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded reducer config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub(crate) fn use_parallel(&self, cells: usize) -> bool {
        self.parallel && cells >= self.min_parallel_cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ReducerConfig::from_json_str("{}").unwrap();
        assert_eq!(c, ReducerConfig::default());
        assert!(!c.use_parallel(1 << 20));
    }

    #[test]
    fn test_partial_json() {
        let c = ReducerConfig::from_json_str(r#"{"parallel": true}"#).unwrap();
        assert!(c.parallel);
        assert_eq!(c.min_parallel_cells, 4096);
        assert!(c.use_parallel(4096));
        assert!(!c.use_parallel(4095));
    }

    #[test]
    fn test_bad_json() {
        let err = ReducerConfig::from_json_str(r#"{"parallel": "yes"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("gridwin-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"parallel": true, "min_parallel_cells": 16}"#).unwrap();
        let c = ReducerConfig::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(c, ReducerConfig::parallel(16));

        let missing = ReducerConfig::from_path(path.with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}

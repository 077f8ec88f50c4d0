use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphBoltError, Result};

/// Buffer size used when streaming text graph files.
pub const READ_BUFFER_SIZE: usize = 1 << 20;

/// Buffer size used when writing archives.
pub const WRITE_BUFFER_SIZE: usize = 1 << 20;

/// Number of requested columns from which in-subgraph extraction gathers in parallel.
pub const PARALLEL_GATHER_THRESHOLD: usize = 4096;

/// Leading bytes of every graph archive.
pub const ARCHIVE_MAGIC: [u8; 8] = *b"GBCSCSG\0";

/// Archive format version written by this crate.
pub const ARCHIVE_VERSION: u32 = 1;

/// How much of the bulk arrays the builder inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Only O(1) shape checks; producers are trusted for the bulk arrays.
    #[default]
    Trusted,
    /// Additionally scans indptr monotonicity and every id range.
    Strict,
}

/// Runtime configuration for the command line tool.
///
/// Every key is optional in the YAML file, missing keys take their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoltConfig {
    /// Validation applied to graphs built from raw arrays.
    pub validation: ValidationLevel,

    /// Size of the rayon pool, 0 keeps the rayon default.
    pub num_threads: usize,

    /// Filter directive handed to the tracing subscriber when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for BoltConfig {
    fn default() -> Self {
        Self {
            validation: ValidationLevel::Trusted,
            num_threads: 0,
            log_filter: "info".to_owned(),
        }
    }
}

impl BoltConfig {
    /// Parses a configuration from a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| GraphBoltError::Config(e.to_string()))
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = BoltConfig::from_yaml("num_threads: 8\n").unwrap();
        assert_eq!(config.num_threads, 8);
        assert_eq!(config.validation, ValidationLevel::Trusted);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_strict_validation_parses() {
        let config = BoltConfig::from_yaml("validation: strict\nlog_filter: debug\n").unwrap();
        assert_eq!(config.validation, ValidationLevel::Strict);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let result = BoltConfig::from_yaml("validation: paranoid\n");
        assert!(matches!(result, Err(GraphBoltError::Config(_))));
    }
}

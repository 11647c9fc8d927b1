//! Engine configuration that can live in a JSON file.
//!
//! ```json
//! { "num_mappers": 8, "num_reducers": 4, "task_timeout_ms": 30000, "max_attempts": 2 }
//! ```
//!
//! Every field is optional in the file; missing ones take the defaults below.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of map tasks (input splits).
    pub num_mappers: usize,
    /// Number of reduce tasks (buckets).
    pub num_reducers: usize,
    /// Per-attempt task timeout in milliseconds.
    pub task_timeout_ms: Option<u64>,
    /// Attempts per task, the first one included.
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_mappers: 4,
            num_reducers: 4,
            task_timeout_ms: None,
            max_attempts: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed to parse engine config {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "num_reducers": 9 }"#).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                num_reducers: 9,
                ..EngineConfig::default()
            }
        );
        assert_eq!(config.task_timeout(), None);
    }

    #[test]
    fn timeout_is_in_milliseconds() {
        let config = EngineConfig::from_json_str(r#"{ "task_timeout_ms": 1500 }"#).unwrap();
        assert_eq!(config.task_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "num_mappers": 2, "max_attempts": 3 }}"#).unwrap();
        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.num_mappers, 2);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.num_reducers, 4);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(EngineConfig::from_json_str("{ not json").is_err());
    }
}

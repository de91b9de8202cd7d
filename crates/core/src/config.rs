//! Board configuration

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

pub const DEFAULT_TASKS_KEY: &str = "kanban-tasks";
pub const DEFAULT_COUNTER_KEY: &str = "kanban-counter";

fn default_tasks_key() -> String {
    DEFAULT_TASKS_KEY.to_string()
}

fn default_counter_key() -> String {
    DEFAULT_COUNTER_KEY.to_string()
}

/// Storage keys used by a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    /// Key holding the lane contents
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,
    /// Key holding the next id to assign
    #[serde(default = "default_counter_key")]
    pub counter_key: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tasks_key: default_tasks_key(),
            counter_key: default_counter_key(),
        }
    }
}

impl BoardConfig {
    /// Parse a JSON config document; missing fields take their defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_tasks_key(mut self, key: impl Into<String>) -> Self {
        self.tasks_key = key.into();
        self
    }

    pub fn with_counter_key(mut self, key: impl Into<String>) -> Self {
        self.counter_key = key.into();
        self
    }

    /// Both keys must be non-empty and distinct
    pub fn validate(&self) -> Result<()> {
        if self.tasks_key.trim().is_empty() || self.counter_key.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Storage keys cannot be empty".to_string(),
            ));
        }
        if self.tasks_key == self.counter_key {
            return Err(Error::InvalidInput(format!(
                "Tasks and counter keys must differ (both are {:?})",
                self.tasks_key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let config = BoardConfig::default();
        assert_eq!(config.tasks_key, "kanban-tasks");
        assert_eq!(config.counter_key, "kanban-counter");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = BoardConfig::from_json(r#"{"tasksKey":"work-tasks"}"#).unwrap();
        assert_eq!(config.tasks_key, "work-tasks");
        assert_eq!(config.counter_key, "kanban-counter");

        let config = BoardConfig::from_json("{}").unwrap();
        assert_eq!(config, BoardConfig::default());
    }

    #[test]
    fn test_rejects_clashing_keys() {
        let result = BoardConfig::from_json(r#"{"tasksKey":"k","counterKey":"k"}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let config = BoardConfig::default().with_counter_key(" ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_rejects_bad_document() {
        let result = BoardConfig::from_json("tasksKey = 1");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}

use serde::{Deserialize, Serialize};
use std::fs;

use crate::settlement::inbound::{ReconcileMode, ReconcilePaths};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Bound on the path resolver cache.
    pub path_cache_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            path_cache_capacity: 256,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettlementConfig {
    /// How line failures relate to the rest of a response file.
    pub reconcile_mode: ReconcileMode,
    /// Workflow paths the reconciler drives per response outcome.
    pub paths: ReconcilePaths,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            reconcile_mode: ReconcileMode::PerLine,
            paths: ReconcilePaths::default(),
        }
    }
}

impl AppConfig {
    pub fn try_load(env: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        serde_yaml::from_str(&content).context("Failed to parse config yaml")
    }

    pub fn load(env: &str) -> Self {
        Self::try_load(env).unwrap_or_else(|e| panic!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "fundflow.log"
use_json: false
rotation: "daily"
enable_tracing: true
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workflow.path_cache_capacity, 256);
        assert_eq!(config.settlement.reconcile_mode, ReconcileMode::PerLine);
        assert!(config.settlement.paths.on_succeeded.is_none());
    }

    #[test]
    fn test_settlement_section() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "fundflow.log"
use_json: true
rotation: "hourly"
enable_tracing: false
settlement:
  reconcile_mode: all-or-nothing
  paths:
    on_succeeded: "settle-succeeded"
    on_failed: "settle-failed"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.settlement.reconcile_mode,
            ReconcileMode::AllOrNothing
        );
        assert_eq!(
            config.settlement.paths.on_succeeded.as_deref(),
            Some("settle-succeeded")
        );
        assert!(config.settlement.paths.on_accepted.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::core::source_store::config::SourceStoreConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingCfg {
    #[serde(default = "default_log_level")] pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)] pub source_store: SourceStoreConfig,
    #[serde(default)] pub logging: LoggingCfg,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingCfg {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_store: SourceStoreConfig::default(),
            logging: LoggingCfg::default(),
        }
    }
}

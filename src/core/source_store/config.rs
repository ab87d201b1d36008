use std::{net::IpAddr, time::Duration};

use serde::{Deserialize, Serialize};

pub fn default_bind_history_timeout_ms() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

fn default_dns_port() -> u16 {
    53
}

/// 源存储运行期配置，来自主配置文件（config.json）的 `sourceStore` 段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceStoreConfig {
    /// 绑定历史录制（含 DNS 反查/正查）的最长耗时，单位毫秒。
    #[serde(default = "default_bind_history_timeout_ms")]
    pub bind_history_timeout_ms: u64,
    #[serde(default)]
    pub dns: DnsRuntimeConfig,
    /// 启动时装载的策略，按顺序追加。
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

impl SourceStoreConfig {
    pub fn bind_history_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_history_timeout_ms)
    }
}

impl Default for SourceStoreConfig {
    fn default() -> Self {
        Self {
            bind_history_timeout_ms: default_bind_history_timeout_ms(),
            dns: DnsRuntimeConfig::default(),
            policies: Vec::new(),
        }
    }
}

/// 绑定历史使用的解析器配置。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsRuntimeConfig {
    /// 使用系统解析配置（/etc/resolv.conf 等）。为 false 时使用 `nameservers`。
    #[serde(default = "default_true")]
    pub use_system: bool,
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,
    #[serde(default = "default_dns_port")]
    pub port: u16,
}

impl Default for DnsRuntimeConfig {
    fn default() -> Self {
        Self {
            use_system: true,
            nameservers: Vec::new(),
            port: default_dns_port(),
        }
    }
}

/// 配置文件中的策略描述。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PolicyConfig {
    Block {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
    Avoid {
        #[serde(rename = "sourceId")]
        source_id: String,
        address: String,
    },
    Reserve {
        #[serde(rename = "sourceId")]
        source_id: String,
        address: String,
    },
    Stick,
}

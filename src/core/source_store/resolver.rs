use std::net::IpAddr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use trust_dns_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

use super::config::DnsRuntimeConfig;

/// 绑定历史使用的可替换 DNS 解析接口。
#[async_trait]
pub trait Resolver: Send + Sync {
    /// 反向解析：IP → 主机名列表。
    async fn lookup_addr(&self, ip: IpAddr) -> Result<Vec<String>>;

    /// 正向解析：主机名（或 IP 字面量）→ IP 列表。
    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// 基于 trust-dns 的解析器。
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn from_config(cfg: &DnsRuntimeConfig) -> Result<Self> {
        let inner = if cfg.use_system || cfg.nameservers.is_empty() {
            if !cfg.use_system {
                tracing::warn!(
                    target = "source_store",
                    "no custom nameservers configured; falling back to system dns"
                );
            }
            TokioAsyncResolver::tokio_from_system_conf().context("load system dns config")?
        } else {
            let group = NameServerConfigGroup::from_ips_clear(&cfg.nameservers, cfg.port, true);
            TokioAsyncResolver::tokio(
                ResolverConfig::from_parts(None, vec![], group),
                ResolverOpts::default(),
            )
        };
        Ok(Self { inner })
    }

    pub fn system() -> Result<Self> {
        Self::from_config(&DnsRuntimeConfig::default())
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_addr(&self, ip: IpAddr) -> Result<Vec<String>> {
        let response = self
            .inner
            .reverse_lookup(ip)
            .await
            .with_context(|| format!("reverse lookup {ip}"))?;
        Ok(response
            .iter()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .collect())
    }

    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        let response = self
            .inner
            .lookup_ip(host)
            .await
            .with_context(|| format!("lookup host {host}"))?;
        let mut ips: Vec<IpAddr> = response.iter().collect();
        ips.sort();
        ips.dedup();
        Ok(ips)
    }
}

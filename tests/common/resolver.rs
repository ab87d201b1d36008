use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use uplink_arbiter_lib::core::source_store::Resolver;

/// 由测试预置应答的解析器，可选注入延迟，并统计调用次数。
#[derive(Default)]
pub struct FakeResolver {
    reverse: HashMap<IpAddr, Vec<String>>,
    forward: HashMap<String, Vec<IpAddr>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, ips: &[&str]) -> Self {
        let parsed = ips.iter().map(|ip| ip.parse().expect("valid ip")).collect();
        self.forward.insert(host.to_string(), parsed);
        self
    }

    pub fn with_ptr(mut self, ip: &str, hosts: &[&str]) -> Self {
        self.reverse.insert(
            ip.parse().expect("valid ip"),
            hosts.iter().map(|h| h.to_string()).collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn lookup_addr(&self, ip: IpAddr) -> Result<Vec<String>> {
        self.pause().await;
        Ok(self.reverse.get(&ip).cloned().unwrap_or_default())
    }

    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.pause().await;
        self.forward
            .get(host)
            .cloned()
            .ok_or_else(|| anyhow!("no such host: {host}"))
    }
}

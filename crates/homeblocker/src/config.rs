use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Context as _;
use homeblocker_rules::{BlockConfig, BlockRegistry};
use serde::Deserialize;

pub const DEFAULT_DNS_PORT: u16 = 53;

/// Contents of `homeblocker.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Port to listen on, `0` falls back to 53
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// `1.1.1.1`, `1.1.1.1:53`, `[2606:4700::1111]:53` or `dns.example.net[:port]`
    pub upstream: String,
    #[serde(default)]
    pub blocks: BTreeMap<String, BlockConfig>,
}

const fn default_port() -> u16 {
    DEFAULT_DNS_PORT
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl Config {
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("error while reading the config file {:?}", path))?;
        Config::parse(&data).with_context(|| format!("error while parsing the config file {:?}", path))
    }

    pub fn parse(data: &str) -> anyhow::Result<Config> {
        let config: Config = serde_yaml::from_str(data).context("malformed YAML")?;
        if config.upstream.trim().is_empty() {
            anyhow::bail!("upstream resolver is empty");
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        let port = if self.port == 0 { DEFAULT_DNS_PORT } else { self.port };
        SocketAddr::new(self.host, port)
    }

    /// Parses every block's schedule. Any malformed schedule fails the whole registry.
    pub fn build_registry(&self) -> anyhow::Result<BlockRegistry> {
        BlockRegistry::from_config(self.blocks.iter().map(|(name, block)| (name.as_str(), block.clone())))
            .context("failed to build the block registry")
    }

    pub async fn resolve_upstream(&self) -> anyhow::Result<SocketAddr> {
        resolve_upstream(&self.upstream).await
    }
}

/// Resolves the upstream resolver address, defaulting to port 53.
pub async fn resolve_upstream(upstream: &str) -> anyhow::Result<SocketAddr> {
    let upstream = upstream.trim();
    if let Ok(addr) = upstream.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = upstream.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_DNS_PORT));
    }

    let target = if upstream.contains(':') {
        upstream.to_string()
    } else {
        format!("{}:{}", upstream, DEFAULT_DNS_PORT)
    };
    let mut addrs = tokio::net::lookup_host(target)
        .await
        .with_context(|| format!("failed to resolve the upstream resolver {:?}", upstream))?;

    addrs
        .next()
        .with_context(|| format!("upstream resolver {:?} has no addresses", upstream))
}

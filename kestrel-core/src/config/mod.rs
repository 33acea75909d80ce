//! Plant configuration
//!
//! Endpoint and timing settings shared by both binaries, loaded from an
//! optional TOML file with `KESTREL_`-prefixed environment overrides on
//! top of built-in defaults. Defaults put the whole plant on loopback.

use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Order gateway TCP endpoint.
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    /// Snapshot multicast group.
    pub snapshot_group: SocketAddrV4,
    /// Incremental multicast group.
    pub incremental_group: SocketAddrV4,
    /// Interface address for multicast sends and joins.
    pub iface: Ipv4Addr,
    /// Seconds between snapshot broadcasts.
    pub snapshot_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub market_data: MarketDataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                addr: "127.0.0.1:12345".parse().expect("default gateway addr"),
            },
            market_data: MarketDataConfig {
                snapshot_group: "233.252.14.1:20000".parse().expect("default snapshot group"),
                incremental_group: "233.252.14.3:20001"
                    .parse()
                    .expect("default incremental group"),
                iface: Ipv4Addr::LOCALHOST,
                snapshot_interval_secs: 60,
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `KESTREL_`-prefixed environment variables (`KESTREL_GATEWAY__ADDR`
    /// and friends).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigLoader::builder()
            .set_default("gateway.addr", "127.0.0.1:12345")?
            .set_default("market_data.snapshot_group", "233.252.14.1:20000")?
            .set_default("market_data.incremental_group", "233.252.14.3:20001")?
            .set_default("market_data.iface", "127.0.0.1")?
            .set_default("market_data.snapshot_interval_secs", 60)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let cfg: Config = builder
            .add_source(Environment::with_prefix("KESTREL").separator("__"))
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.market_data.snapshot_group.ip().is_multicast() {
            anyhow::bail!(
                "snapshot group {} is not a multicast address",
                self.market_data.snapshot_group
            );
        }
        if !self.market_data.incremental_group.ip().is_multicast() {
            anyhow::bail!(
                "incremental group {} is not a multicast address",
                self.market_data.incremental_group
            );
        }
        if self.market_data.snapshot_group == self.market_data.incremental_group {
            anyhow::bail!("snapshot and incremental groups must differ");
        }
        if self.market_data.snapshot_interval_secs == 0 {
            anyhow::bail!("snapshot_interval_secs must be positive");
        }
        Ok(())
    }
}

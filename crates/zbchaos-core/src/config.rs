//! zbchaos.toml configuration parser.
//!
//! Every field is optional; a missing file or section falls back to the
//! defaults below. Durations are written as `500ms`, `5s`, `5m` or a bare
//! number of seconds.

use std::path::Path;
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:9600/actuator";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub cluster: ClusterConfig,
    pub watch: WatchConfig,
    pub scale: ScaleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the management actuator, without the `/cluster` suffix.
    pub endpoint: String,
    pub request_timeout: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval: String,
    /// Bound for ordinary waits.
    pub timeout: String,
    /// Bound for waits after a scale down, which must allow data to move
    /// off the leaving brokers.
    pub scale_down_timeout: String,
    /// Bound for waiting on the expected broker count before a forced
    /// failover.
    pub failover_timeout: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: "5s".to_string(),
            timeout: "5m".to_string(),
            scale_down_timeout: "25m".to_string(),
            failover_timeout: "5m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Resume the platform's reconciliation after a successful change.
    pub resume_reconciliation: bool,
}

impl ChaosConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: ChaosConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.cluster.endpoint.starts_with("http://") {
            bail!(
                "cluster.endpoint must be an http:// URL, got {:?}",
                self.cluster.endpoint
            );
        }
        for (key, value) in [
            ("cluster.request_timeout", &self.cluster.request_timeout),
            ("watch.poll_interval", &self.watch.poll_interval),
            ("watch.timeout", &self.watch.timeout),
            ("watch.scale_down_timeout", &self.watch.scale_down_timeout),
            ("watch.failover_timeout", &self.watch.failover_timeout),
        ] {
            match parse_duration(value) {
                Some(d) if !d.is_zero() => {}
                _ => bail!("{key} must be a positive duration, got {value:?}"),
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        parse_duration(&self.cluster.request_timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn poll_interval(&self) -> Duration {
        parse_duration(&self.watch.poll_interval).unwrap_or(Duration::from_secs(5))
    }

    pub fn watch_timeout(&self) -> Duration {
        parse_duration(&self.watch.timeout).unwrap_or(Duration::from_secs(5 * 60))
    }

    pub fn scale_down_timeout(&self) -> Duration {
        parse_duration(&self.watch.scale_down_timeout).unwrap_or(Duration::from_secs(25 * 60))
    }

    pub fn failover_timeout(&self) -> Duration {
        parse_duration(&self.watch.failover_timeout).unwrap_or(Duration::from_secs(5 * 60))
    }
}

/// Parse a duration string like "5s", "500ms", "25m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

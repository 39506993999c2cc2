//! Bridge configuration
//!
//! Both binaries read the same YAML file so the listener and the sampler agree on the
//! shared region name, staleness timeout and output prefix. Every key is optional:
//!
//! ```yaml
//! port: 5500
//! bind_address: 0.0.0.0
//! shm_name: /fgfdm-ed3e3f4a
//! timeout_ms: 3000
//! period_us: 1000
//! pin_prefix: fgfdm
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BridgeError, Result};

/// Default UDP port of FlightGear's native-FDM output.
pub const DEFAULT_PORT: u16 = 5500;

/// Shared region name used when none is configured.
pub const DEFAULT_SHM_NAME: &str = "/fgfdm-ed3e3f4a";

/// Staleness timeout shared by the listener and the sampler.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// UDP port to listen on
    pub port: u16,
    /// Local address to bind
    pub bind_address: IpAddr,
    /// POSIX shared memory name of the ring channel
    pub shm_name: String,
    /// No-data interval after which telemetry is flagged stale
    pub timeout_ms: u64,
    /// Control period of the sampling task
    pub period_us: u64,
    /// First segment of every output name
    pub pin_prefix: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            shm_name: DEFAULT_SHM_NAME.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            period_us: 1000,
            pin_prefix: "fgfdm".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load and validate configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config_with_source(format!("cannot read {}", path.display()), Box::new(e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str::<Self>(yaml).map_err(|e| {
                BridgeError::config_with_source("YAML parsing failed", Box::new(e))
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(BridgeError::config("timeout_ms must be positive"));
        }
        if self.period_us == 0 {
            return Err(BridgeError::config("period_us must be positive"));
        }
        if self.pin_prefix.is_empty() || self.pin_prefix.split('.').any(str::is_empty) {
            return Err(BridgeError::config(format!(
                "pin_prefix `{}` has an empty segment",
                self.pin_prefix
            )));
        }
        #[cfg(unix)]
        crate::shm::validate_name(&self.shm_name)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_micros(self.period_us)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

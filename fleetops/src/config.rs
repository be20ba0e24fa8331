//! Configuration for the fleetops service.
//!
//! Sources, later overriding earlier:
//! 1. Default values
//! 2. TOML file named by `FLEETOPS_CONFIG`, else `fleetops.toml` in the working directory
//! 3. Environment variables prefixed with `FLEETOPS_`, using `__` between section and key
//!    (`FLEETOPS_DATABASE__URL`, `FLEETOPS_CACHE__TTL_SECS`)

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "fleetops.toml";
const CONFIG_PATH_VAR: &str = "FLEETOPS_CONFIG";
const ENV_PREFIX: &str = "FLEETOPS_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Origins allowed by CORS. Empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Apply pending migrations at startup.
    pub run_migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached list results. `0` disables the cache.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

/// First-run setup. Ignored once any organization exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub organization_name: Option<String>,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://fleetops.db?mode=rwc".to_string(),
            run_migrations: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fleetops=info,fleetcrud=info,tower_http=info".to_string(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl BootstrapConfig {
    /// Organization name and admin email, when both are configured.
    #[must_use]
    pub fn requested(&self) -> Option<(&str, &str)> {
        let name = self.organization_name.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let email = self.admin_email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((name, email))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_VAR).map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), PathBuf::from);
        Self::load_from(&path)
    }

    /// Load configuration using the given TOML file (which may be absent).
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config: Self = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(Error::config_validation("server.bind_address must not be empty"));
        }
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::config_validation(format!(
                "server.bind_address '{}' is not a socket address",
                self.server.bind_address
            )));
        }
        if self.database.url.trim().is_empty() {
            return Err(Error::config_validation("database.url must not be empty"));
        }
        if let Some(email) = self.bootstrap.admin_email.as_deref()
            && !email.trim().is_empty()
            && fleetcrud::validation::validators::validate_email("admin_email", email).is_err()
        {
            return Err(Error::config_validation(format!(
                "bootstrap.admin_email '{email}' is not an email address"
            )));
        }
        Ok(())
    }
}

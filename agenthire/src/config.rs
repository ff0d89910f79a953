use crate::backend::DEFAULT_BACKEND_URL;
use crate::error::{AppError, Result};
use crate::orchestrator::OrchestratorOptions;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROCESSING_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend_url: String,
    pub config_dir: PathBuf,
    /// Overrides the first RPC URL of `network.ron`
    pub rpc_url: Option<String>,
    pub wallet_private_key: Option<String>,
    /// Watch-only address used when no private key is set
    pub wallet_address: Option<String>,
    pub agent_processing_delay: Duration,
    pub refetch_reputation: bool,
    pub disable_frontend: bool,
    pub frontend_dist: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a valid number, got '{}'", p)))?,
            None => DEFAULT_PORT,
        };

        let delay_ms = match get("AGENT_PROCESSING_DELAY_MS") {
            Some(d) => d.parse().map_err(|_| {
                AppError::Config(format!("AGENT_PROCESSING_DELAY_MS must be a number of milliseconds, got '{}'", d))
            })?,
            None => DEFAULT_PROCESSING_DELAY_MS,
        };

        Ok(Self {
            port,
            backend_url: get("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            config_dir: get("CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_config_dir),
            rpc_url: get("RPC_URL"),
            wallet_private_key: get("WALLET_PRIVATE_KEY"),
            wallet_address: get("WALLET_ADDRESS"),
            agent_processing_delay: Duration::from_millis(delay_ms),
            refetch_reputation: get("REFETCH_REPUTATION").map(|v| is_truthy(&v)).unwrap_or(false),
            disable_frontend: get("DISABLE_FRONTEND").map(|v| is_truthy(&v)).unwrap_or(false),
            frontend_dist: get("FRONTEND_DIST").map(PathBuf::from),
        })
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            processing_delay: self.agent_processing_delay,
            refetch_reputation: self.refetch_reputation,
        }
    }
}

/// `./config`, or `../config` when run from a subdirectory
fn default_config_dir() -> PathBuf {
    if Path::new("./config").exists() {
        PathBuf::from("./config")
    } else if Path::new("../config").exists() {
        PathBuf::from("../config")
    } else {
        PathBuf::from("./config")
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend_url, "http://localhost:3001");
        assert_eq!(config.agent_processing_delay, Duration::from_millis(2000));
        assert!(!config.refetch_reputation);
        assert!(config.wallet_private_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("BACKEND_URL", "https://api.example.com"),
            ("AGENT_PROCESSING_DELAY_MS", "0"),
            ("REFETCH_REPUTATION", "true"),
            ("WALLET_ADDRESS", "  "),
            ("CONFIG_DIR", "/etc/agenthire"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.backend_url, "https://api.example.com");
        assert!(config.orchestrator_options().processing_delay.is_zero());
        assert!(config.orchestrator_options().refetch_reputation);
        assert!(config.wallet_address.is_none());
        assert_eq!(config.config_dir, PathBuf::from("/etc/agenthire"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert_eq!(config_from(&[("PORT", "http")]).unwrap_err().kind(), "config");
        assert!(config_from(&[("AGENT_PROCESSING_DELAY_MS", "2s")]).is_err());
    }
}

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for scrutin
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrutinConfig {
    /// Workflow administration settings
    pub admin: AdminConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Address of the single admin identity, fixed at workflow creation
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level directive for the tracing subscriber
    pub log_level: String,
    /// Emit logs as JSON instead of human-readable lines
    pub json_logs: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            // First default hardhat account, same identity the original
            // deployment scripts act as.
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for ScrutinConfig {
    fn default() -> Self {
        Self {
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ScrutinConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. scrutin.toml in the working directory
    /// 3. Environment variables (SCRUTIN_ADMIN__ADDRESS etc.)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("scrutin.toml").exists() {
            builder = builder.add_source(File::with_name("scrutin"));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCRUTIN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

use std::time::Duration;

use common::retry::RetryPolicy;
use common::storage::pinata::PinataSettings;
use config::{Config, ConfigError, Environment, File};
use ledger::EvmSettings;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobStoreConfig {
    pub api_url: String,
    pub gateway_url: String,
    pub api_key: String,
    pub secret_api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub private_key: String,
    /// Resolved from the node when absent.
    pub chain_id: Option<u64>,
    pub rpc_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub gas_limit_percent: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Base URL of the classifier. Severity defaults to 1 when unset.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorConfig {
    /// Blob fetches in flight per list/search request.
    pub max_concurrent_fetches: usize,
    /// Blob cache entries. 0 disables the cache.
    pub cache_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub blob_store: BlobStoreConfig,
    pub ledger: LedgerConfig,
    pub classifier: ClassifierConfig,
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.cors.max_age", 3600)?
            .set_default("blob_store.api_url", "https://api.pinata.cloud")?
            .set_default("blob_store.gateway_url", "https://gateway.pinata.cloud")?
            .set_default("blob_store.timeout_secs", 10)?
            .set_default("ledger.rpc_timeout_secs", 15)?
            .set_default("ledger.confirmation_timeout_secs", 120)?
            .set_default("ledger.poll_interval_ms", 2000)?
            .set_default("ledger.gas_limit_percent", 120)?
            .set_default("classifier.timeout_secs", 5)?
            .set_default("aggregator.max_concurrent_fetches", 16)?
            .set_default("aggregator.cache_capacity", 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FIR__LEDGER__PRIVATE_KEY)
            .add_source(
                Environment::with_prefix("FIR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins"),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("blob_store.api_url", &self.blob_store.api_url)?;
        require_url("blob_store.gateway_url", &self.blob_store.gateway_url)?;
        require_url("ledger.rpc_url", &self.ledger.rpc_url)?;
        if let Some(url) = &self.classifier.url {
            require_url("classifier.url", url)?;
        }

        require_non_empty("blob_store.api_key", &self.blob_store.api_key)?;
        require_non_empty("blob_store.secret_api_key", &self.blob_store.secret_api_key)?;
        require_non_empty("ledger.contract_address", &self.ledger.contract_address)?;
        require_non_empty("ledger.private_key", &self.ledger.private_key)?;

        require_positive("blob_store.timeout_secs", self.blob_store.timeout_secs)?;
        require_positive("ledger.rpc_timeout_secs", self.ledger.rpc_timeout_secs)?;
        require_positive(
            "ledger.confirmation_timeout_secs",
            self.ledger.confirmation_timeout_secs,
        )?;
        require_positive("ledger.poll_interval_ms", self.ledger.poll_interval_ms)?;
        require_positive("classifier.timeout_secs", self.classifier.timeout_secs)?;
        require_positive(
            "aggregator.max_concurrent_fetches",
            self.aggregator.max_concurrent_fetches as u64,
        )?;

        if self.ledger.gas_limit_percent < 100 {
            return Err(ConfigError::Message(
                "ledger.gas_limit_percent must be at least 100".into(),
            ));
        }
        Ok(())
    }

    pub fn pinata_settings(&self) -> PinataSettings {
        PinataSettings {
            api_url: self.blob_store.api_url.clone(),
            gateway_url: self.blob_store.gateway_url.clone(),
            api_key: self.blob_store.api_key.clone(),
            secret_api_key: self.blob_store.secret_api_key.clone(),
            timeout: Duration::from_secs(self.blob_store.timeout_secs),
        }
    }

    pub fn evm_settings(&self) -> EvmSettings {
        EvmSettings {
            rpc_url: self.ledger.rpc_url.clone(),
            contract_address: self.ledger.contract_address.clone(),
            private_key: self.ledger.private_key.clone(),
            chain_id: self.ledger.chain_id,
            rpc_timeout: Duration::from_secs(self.ledger.rpc_timeout_secs),
            confirmation_timeout: Duration::from_secs(self.ledger.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.ledger.poll_interval_ms),
            gas_limit_percent: self.ledger.gas_limit_percent,
            retry: self.retry,
        }
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Message(format!("{key} must be set")));
    }
    Ok(())
}

fn require_url(key: &str, value: &str) -> Result<(), ConfigError> {
    require_non_empty(key, value)?;
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::Message(format!(
            "{key} must be an http(s) URL, got '{value}'"
        )));
    }
    Ok(())
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Message(format!("{key} must be greater than 0")));
    }
    Ok(())
}

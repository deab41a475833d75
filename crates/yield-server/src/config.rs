//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use yield_core::predictor::{
    TrainerConfig, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS, DEFAULT_HIDDEN_LAYERS,
    DEFAULT_LEARNING_RATE,
};

/// Server configuration, read from `YIELD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Instance label attached to log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Training CSV path
    #[serde(default = "default_data_path")]
    pub data_path: String,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Fixed training seed; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string())
}

fn default_port() -> u16 {
    3000
}

fn default_data_path() -> String {
    "crop_data.csv".to_string()
}

fn default_epochs() -> usize {
    DEFAULT_EPOCHS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_learning_rate() -> f32 {
    DEFAULT_LEARNING_RATE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            port: default_port(),
            data_path: default_data_path(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("YIELD").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.trainer_config().validate()?;
        Ok(config)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            seed: self.seed,
        }
    }
}

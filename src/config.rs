use std::collections::HashMap;
use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

use crate::events::{EventKind, EventRouting, EventRoutingError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Application configuration with validation. Loaded in layers: defaults,
/// `config/default`, `config/{env}`, then `APP__*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Capacity of the in-process event channel drained by the sink bridge.
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 250))]
    pub default_page_size: u64,

    /// Event kind name -> destination topic. Missing entries fall back to
    /// the built-in routing; present entries must name known kinds.
    #[serde(default)]
    pub event_routes: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            event_channel_capacity: default_event_channel_capacity(),
            default_page_size: default_page_size(),
            event_routes: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Builds the routing table: configured destinations override the
    /// defaults per kind, unspecified kinds keep their default topic.
    pub fn event_routing(&self) -> Result<EventRouting, EventRoutingError> {
        if self.event_routes.is_empty() {
            return Ok(EventRouting::default());
        }
        let mut merged: HashMap<String, String> = HashMap::new();
        let defaults = EventRouting::default();
        for kind in <EventKind as strum::IntoEnumIterator>::iter() {
            merged.insert(kind.to_string(), defaults.destination(kind).to_string());
        }
        for (name, destination) in &self.event_routes {
            // Probe the name so typos fail at startup, not at first emit.
            name.parse::<EventKind>()
                .map_err(|_| EventRoutingError::UnknownKind(name.clone()))?;
            merged.insert(name.clone(), destination.clone());
        }
        EventRouting::from_map(&merged)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("event routing configuration invalid: {0}")]
    Routing(#[from] EventRoutingError),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_page_size() -> u64 {
    crate::common::DEFAULT_PAGE_SIZE
}

/// Loads application configuration from files and `APP__*` env vars.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    // Surface routing typos at startup.
    app_config.event_routing()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes tracing using the configured log level as the default filter;
/// `RUST_LOG` overrides it when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("movement_core={level}");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

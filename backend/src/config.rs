//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::gemini::config::GeminiConfig;
use crate::state::Stop;
use std::env;
use std::path::PathBuf;

/// Default depot address the route starts from
pub const DEFAULT_START_ADDRESS: &str = "新北市板橋區金門街215巷78-5號";
/// Default depot display name
pub const DEFAULT_START_NAME: &str = "TilePark 本社";
/// Default depot note
pub const DEFAULT_START_NOTE: &str = "出發前確認庫存單據";
/// Default departure time, `HH:MM`
pub const DEFAULT_DEPARTURE_TIME: &str = "08:30";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
    /// Gemini API configuration
    pub gemini: GeminiConfig,
    /// Route defaults and optimizer selection
    pub route: RouteConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Base directory holding the route snapshot
    pub data_dir: PathBuf,
}

/// Which optimizer reorders the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    /// Ask Gemini for the delivery order
    Gemini,
    /// Local region-bucket heuristic, no network
    Local,
}

impl OptimizerKind {
    /// Parse the `ROUTE_OPTIMIZER` value, defaulting to Gemini
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("local") {
            OptimizerKind::Local
        } else {
            OptimizerKind::Gemini
        }
    }
}

/// Route configuration
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Optimizer requested by the operator
    pub optimizer: OptimizerKind,
    /// Address of the start stop used when no snapshot exists
    pub start_address: String,
    /// Display name of the default start stop
    pub start_name: String,
    /// Note on the default start stop
    pub start_note: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerKind::Gemini,
            start_address: DEFAULT_START_ADDRESS.to_string(),
            start_name: DEFAULT_START_NAME.to_string(),
            start_note: DEFAULT_START_NOTE.to_string(),
        }
    }
}

impl RouteConfig {
    /// Build the default start stop
    pub fn start_stop(&self) -> Stop {
        Stop::start(
            self.start_address.clone(),
            self.start_name.clone(),
            self.start_note.clone(),
        )
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let route_defaults = RouteConfig::default();
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            persistence: PersistenceConfig {
                data_dir: env::var_os("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| {
                        // Default to ~/.tile-route or current directory
                        if let Some(home) = env::var_os("HOME") {
                            PathBuf::from(home).join(".tile-route")
                        } else {
                            PathBuf::from(".tile-route")
                        }
                    }),
            },
            gemini: GeminiConfig::from_env(),
            route: RouteConfig {
                optimizer: env::var("ROUTE_OPTIMIZER")
                    .map(|v| OptimizerKind::parse(&v))
                    .unwrap_or(route_defaults.optimizer),
                start_address: non_empty_var("START_ADDRESS")
                    .unwrap_or(route_defaults.start_address),
                start_name: non_empty_var("START_NAME").unwrap_or(route_defaults.start_name),
                start_note: env::var("START_NOTE").unwrap_or(route_defaults.start_note),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

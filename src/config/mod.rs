//! Configuration module for the wiki backend.
//!
//! Every setting is an explicit field populated from one environment variable,
//! with defaults for local development.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Default name of the namespace holding wiki records and the wiki slug view.
pub const DEFAULT_MAIN_DB: &str = "wikifeat_main_db";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file backing the document store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Namespace for wiki records; also the scope of the main admin role
    pub main_db_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("WIKI_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("WIKI_DB_PATH")
            .unwrap_or_else(|_| "./data/wiki.sqlite".to_string())
            .into();

        let bind_addr_raw =
            env::var("WIKI_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr_raw.parse().map_err(|e| {
            AppError::Internal(format!("Invalid WIKI_BIND_ADDR {:?}: {}", bind_addr_raw, e))
        })?;

        let log_level = env::var("WIKI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let main_db_name = env::var("WIKI_MAIN_DB").unwrap_or_else(|_| DEFAULT_MAIN_DB.to_string());

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            main_db_name,
        })
    }
}

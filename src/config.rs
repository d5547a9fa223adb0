use std::path::PathBuf;

use crate::errors::PulseError;

pub const DEFAULT_API_BASE: &str = "http://localhost:3001";
pub const DEFAULT_SNAPSHOT_PATH: &str = "data_snapshot.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub service_key: String,
    pub api_base: String,
    pub snapshot_path: PathBuf,
}

impl Config {
    /// Read configuration from the environment. The store URL and service
    /// key are required; missing either is fatal at startup, not per
    /// request.
    pub fn from_env() -> Result<Self, PulseError> {
        let supabase_url = require("SUPABASE_URL")?;
        let service_key = require("SUPABASE_SERVICE_KEY")?;
        let api_base =
            std::env::var("DASHBOARD_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SNAPSHOT_PATH));

        Ok(Self {
            supabase_url,
            service_key,
            api_base,
            snapshot_path,
        })
    }
}

fn require(name: &str) -> Result<String, PulseError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PulseError::Configuration(format!("{name} must be set"))),
    }
}

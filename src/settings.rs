use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::engine::EngineLimits;

pub const FALLBACK_LOG_DIR: &str = "/tmp/logs";

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_env")]
    pub env: String, // file / server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub prefix: Option<String>,
    #[serde(default = "default_log_dir")]
    pub app_log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_batch_items")]
    pub max_batch_items: usize,
}

fn default_env() -> String {
    "file".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_dir() -> String {
    FALLBACK_LOG_DIR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_bytes() -> usize {
    EngineLimits::default().max_upload_bytes
}

fn default_max_batch_items() -> usize {
    EngineLimits::default().max_batch_items
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: default_env(),
            host: default_host(),
            port: default_port(),
            prefix: None,
            app_log_dir: default_log_dir(),
            log_level: default_log_level(),
            max_upload_bytes: default_max_upload_bytes(),
            max_batch_items: default_max_batch_items(),
        }
    }
}

impl Config {
    pub fn limits(&self) -> EngineLimits {
        EngineLimits {
            max_upload_bytes: self.max_upload_bytes,
            max_batch_items: self.max_batch_items,
        }
    }

    pub fn source(&self) -> &'static str {
        if self.env == "file" {
            ".env file"
        } else {
            "server environment"
        }
    }

    pub fn prefix(&self) -> String {
        self.prefix.clone().unwrap_or("/".to_string())
    }
}

/// Runs before logging is installed; the caller logs `Config::source`.
pub fn get_config() -> Result<Config> {
    let env_var = env::var("ENV").unwrap_or(default_env());
    if env_var == "file" {
        let _ = dotenvy::dotenv();
    }
    envy::from_env::<Config>().context("invalid configuration in environment")
}

/// Where logs go, and why it is not the configured directory when it had to fall back.
#[derive(Debug, Clone)]
pub struct LogDir {
    pub path: PathBuf,
    pub fallback_reason: Option<String>,
}

/// Creates the log directory, falling back to `/tmp/logs` when it cannot be created.
pub fn prepare_log_dir(requested: &str) -> Result<LogDir> {
    let requested = PathBuf::from(requested);
    match std::fs::create_dir_all(&requested) {
        Ok(()) => Ok(LogDir { path: requested, fallback_reason: None }),
        Err(e) => {
            let fallback = PathBuf::from(FALLBACK_LOG_DIR);
            std::fs::create_dir_all(&fallback)
                .with_context(|| format!("could not create {}", fallback.display()))?;
            Ok(LogDir {
                path: fallback,
                fallback_reason: Some(format!("could not create {}: {}", requested.display(), e)),
            })
        }
    }
}

/// Writes and removes a probe file.
pub fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(".write_probe");
    std::fs::write(&probe, b"test")?;
    std::fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_limits() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.prefix(), "/");
        assert_eq!(config.limits(), EngineLimits::default());
        assert_eq!(config.source(), ".env file");

        let server = Config { env: "server".to_string(), ..Config::default() };
        assert_eq!(server.source(), "server environment");
    }

    #[test]
    fn log_dir_is_created_and_writable() {
        let dir = std::env::temp_dir().join(format!("qr-forge-logs-{}", std::process::id()));
        let prepared = prepare_log_dir(dir.to_str().unwrap()).unwrap();
        assert_eq!(prepared.path, dir);
        assert!(prepared.fallback_reason.is_none());
        assert!(probe_writable(&prepared.path).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

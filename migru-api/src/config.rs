//! Configuration resolution for migru-api
//!
//! Settings come from CLI arguments (highest priority), environment
//! variables, the Migru TOML config file, then compiled defaults.

use clap::Parser;
use migru_common::config::{self, TomlConfig};
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_PORT: u16 = 8000;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "migru-api", about = "Migru migraine-tracking backend service")]
pub struct Args {
    /// Data directory holding migru.db
    #[arg(long)]
    pub data_dir: Option<String>,

    /// HTTP listen port
    #[arg(long, env = "MIGRU_PORT")]
    pub port: Option<u16>,

    /// Disable the dev-mode demo user fallback
    #[arg(long)]
    pub no_dev_mode: bool,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,
    /// Data directory (holds migru.db)
    pub data_dir: PathBuf,
    /// Dev mode: unauthenticated requests map to a demo user
    pub dev_mode: bool,
    /// Hume API key (token brokering falls back to a mock token without it)
    pub hume_api_key: Option<String>,
    /// Hume secret key
    pub hume_secret_key: Option<String>,
}

impl ServiceConfig {
    /// Resolve configuration from CLI args, environment, and TOML file
    pub fn resolve(args: &Args) -> Self {
        let toml_config = config::load_toml_config().unwrap_or_else(|_| TomlConfig::default());

        let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), "MIGRU_DATA_DIR");

        let port = args
            .port
            .or(toml_config.port)
            .unwrap_or(DEFAULT_PORT);

        // Dev mode defaults to on, like the rest of the Migru stack.
        // MIGRU_DEV_MODE=false or --no-dev-mode turns it off.
        let dev_mode = if args.no_dev_mode {
            false
        } else {
            match std::env::var("MIGRU_DEV_MODE") {
                Ok(v) => v.to_lowercase() != "false",
                Err(_) => toml_config.dev_mode.unwrap_or(true),
            }
        };

        let hume_api_key = std::env::var("HUME_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or(toml_config.hume_api_key);
        let hume_secret_key = std::env::var("HUME_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or(toml_config.hume_secret_key);

        if hume_api_key.is_none() || hume_secret_key.is_none() {
            warn!("Hume credentials not configured - /hume/auth will return a mock token");
        }

        Self {
            port,
            data_dir,
            dev_mode,
            hume_api_key,
            hume_secret_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            data_dir: Some("/tmp/migru-config-test".to_string()),
            port: None,
            no_dev_mode: false,
        }
    }

    #[test]
    fn default_port_applies() {
        let config = ServiceConfig::resolve(&base_args());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn cli_port_wins() {
        let mut args = base_args();
        args.port = Some(9001);
        let config = ServiceConfig::resolve(&args);
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn no_dev_mode_flag_disables_fallback() {
        let mut args = base_args();
        args.no_dev_mode = true;
        let config = ServiceConfig::resolve(&args);
        assert!(!config.dev_mode);
    }
}

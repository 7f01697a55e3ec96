use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::constants;
use crate::utils::timezone::SAO_PAULO_TZ;

/// Runtime configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Zone operation-day windows are computed in
    pub timezone: Tz,
    /// Directory holding the local durable storage file
    pub data_dir: PathBuf,
    /// Initial page size for the merged listing
    pub default_page_size: u32,
}

impl AppConfig {
    /// Load configuration from `.env` / process environment.
    ///
    /// Every setting has a default; a present but unparseable value is an
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let timezone = match env::var("ROLETAFLOW_TIMEZONE") {
            Ok(raw) => raw
                .parse::<Tz>()
                .with_context(|| format!("Invalid ROLETAFLOW_TIMEZONE: {raw}"))?,
            Err(_) => SAO_PAULO_TZ,
        };

        let data_dir = env::var("ROLETAFLOW_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let default_page_size = match env::var("ROLETAFLOW_PAGE_SIZE") {
            Ok(raw) => {
                let size: u32 = raw
                    .parse()
                    .with_context(|| format!("Invalid ROLETAFLOW_PAGE_SIZE: {raw}"))?;
                if !constants::PAGE_SIZE_CHOICES.contains(&size) {
                    anyhow::bail!(
                        "ROLETAFLOW_PAGE_SIZE must be one of {:?}, got {size}",
                        constants::PAGE_SIZE_CHOICES
                    );
                }
                size
            }
            Err(_) => constants::DEFAULT_PAGE_SIZE,
        };

        info!(
            "Configuration loaded - timezone: {}, data dir: {}, page size: {}",
            timezone,
            data_dir.display(),
            default_page_size
        );

        Ok(Self {
            timezone,
            data_dir,
            default_page_size,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: SAO_PAULO_TZ,
            data_dir: PathBuf::from("data"),
            default_page_size: constants::DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.timezone, SAO_PAULO_TZ);
        assert_eq!(config.default_page_size, constants::DEFAULT_PAGE_SIZE);
    }
}

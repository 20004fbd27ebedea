use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::implicit::OAuthConfig;

pub const CLIENT_ID_ENV: &str = "MAILHUB_CLIENT_ID";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080";
pub const DEFAULT_SAMPLE_SIZE: u32 = 20;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub db_path: Option<String>,
    pub sample_size: Option<u32>,
    pub api_base_url: Option<String>,
}

impl Config {
    /// The client id, preferring the environment over the file.
    pub fn client_id(&self) -> Option<String> {
        std::env::var(CLIENT_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.client_id.clone())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    pub fn sample_size(&self) -> u32 {
        self.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE)
    }

    pub fn oauth(&self) -> OAuthConfig {
        OAuthConfig::new(self.client_id(), self.redirect_uri())
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mailhub"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("mailhub.db");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Reads `path`, writing a commented template there first if it does not
/// exist. A missing client id is not an error here; login reports it.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config {
            client_id: Some(String::new()),
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            db_path: None,
            sample_size: Some(DEFAULT_SAMPLE_SIZE),
            api_base_url: None,
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(
            path,
            format!("# Put your OAuth client id below (or export {CLIENT_ID_ENV}).\n{tom}"),
        )
        .with_context(|| format!("writing template config to {}", path.display()))?;
        info!("created template config at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}

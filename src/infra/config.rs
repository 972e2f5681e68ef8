use crate::domain::RetentionPolicy;
use crate::domain::policy::DEFAULT_SAFETY_DURATION;
use crate::infra::podman_adapter::DEFAULT_PODMAN_BINARY;
use crate::services::CleanOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_TOML_NAME: &str = "podsweep.toml";

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/podsweep")
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    pub exclude: Option<Vec<String>>,
    #[serde(default, with = "humantime_serde")]
    pub safety_duration: Option<Duration>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeleteConfig {
    pub dangling: Option<bool>,
    pub leaf: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PodmanConfig {
    pub binary: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub delete: DeleteConfig,
    #[serde(default)]
    pub podman: PodmanConfig,
}

impl AppConfig {
    /// Merges another AppConfig into self.
    /// Values from `other` overwrite values in `self` if present; exclude
    /// lists are concatenated.
    pub fn merge(&mut self, other: AppConfig) {
        if let Some(excludes) = other.retention.exclude {
            let mut current = self.retention.exclude.take().unwrap_or_default();
            for tag in excludes {
                if !current.contains(&tag) {
                    current.push(tag);
                }
            }
            self.retention.exclude = Some(current);
        }
        if let Some(duration) = other.retention.safety_duration {
            self.retention.safety_duration = Some(duration);
        }
        if let Some(dangling) = other.delete.dangling {
            self.delete.dangling = Some(dangling);
        }
        if let Some(leaf) = other.delete.leaf {
            self.delete.leaf = Some(leaf);
        }
        if let Some(binary) = other.podman.binary {
            self.podman.binary = Some(binary);
        }
    }

    pub fn podman_binary(&self) -> &str {
        self.podman
            .binary
            .as_deref()
            .unwrap_or(DEFAULT_PODMAN_BINARY)
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            policy: RetentionPolicy {
                exclude: self.retention.exclude.clone().unwrap_or_default(),
                safety_duration: self
                    .retention
                    .safety_duration
                    .unwrap_or(DEFAULT_SAFETY_DURATION),
            },
            delete_dangling: self.delete.dangling.unwrap_or(false),
            delete_leaf: self.delete.leaf.unwrap_or(false),
        }
    }
}

pub fn parse_app_config(content: &str) -> Result<AppConfig> {
    Ok(toml::from_str(content)?)
}

fn read_app_config(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).with_context(|| format!("lendo {:?}", path))?;
    let config = parse_app_config(&content).with_context(|| format!("parse de {:?}", path))?;
    debug!("Config carregada de {:?}", path);

    Ok(Some(config))
}

/// Config files consulted, global first.
pub fn config_paths(config_dir: &Path) -> [PathBuf; 2] {
    [
        config_dir.join(DEFAULT_CONFIG_TOML_NAME),
        PathBuf::from("./").join(DEFAULT_CONFIG_TOML_NAME),
    ]
}

/// Loads the global config from `config_dir`, then the one in the current
/// directory on top of it.
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig> {
    load_app_config_from(&config_paths(config_dir))
}

pub fn load_app_config_from(paths: &[PathBuf]) -> Result<AppConfig> {
    let mut app_config = AppConfig::default();

    for path in paths {
        if let Some(config) = read_app_config(path)? {
            app_config.merge(config);
        }
    }

    Ok(app_config)
}

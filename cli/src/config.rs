use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use fitlog_core::plugin::{RemoteDefinition, RemoteRegistry, default_remotes};
use fitlog_core::profile::LegacyMirror;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "fitlog.db";
const LOCAL_STORAGE_FILE_NAME: &str = "local-storage.json";
const ENV_PREFIX: &str = "FITLOG_";

pub const DEFAULT_INSIGHTS_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Manifest URL used in production builds.
    pub url: Option<String>,
    pub dev_port: u16,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: None,
            dev_port: 4200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INSIGHTS_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

/// Settings layered from defaults, `config.toml` and `FITLOG_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Resolve remotes against their production URLs instead of localhost.
    pub production: bool,
    /// Keep writing the profile to the legacy local-storage file on every save.
    pub legacy_mirror: bool,
    pub remotes: BTreeMap<String, RemoteSettings>,
    pub insights: InsightSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let remotes = default_remotes()
            .into_iter()
            .map(|r| {
                (
                    r.name,
                    RemoteSettings {
                        url: r.production_url,
                        dev_port: r.dev_port,
                    },
                )
            })
            .collect();
        Self {
            production: false,
            legacy_mirror: true,
            remotes,
            insights: InsightSettings::default(),
        }
    }
}

impl Settings {
    pub fn load_from(config_file: &Path) -> Result<Self> {
        let settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Invalid configuration in {}", config_file.display()))?;
        Ok(settings)
    }

    #[must_use]
    pub fn remote_registry(&self) -> RemoteRegistry {
        let remotes = self
            .remotes
            .iter()
            .map(|(name, r)| RemoteDefinition::new(name, r.dev_port, r.url.as_deref()))
            .collect();
        RemoteRegistry::new(self.production, remotes)
    }

    #[must_use]
    pub fn mirror(&self) -> LegacyMirror {
        if self.legacy_mirror {
            LegacyMirror::DualWrite
        } else {
            LegacyMirror::MigrateOnly
        }
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub local_storage_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "fitlog").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = proj_dirs.config_dir().join(CONFIG_FILE_NAME);
        let settings = Settings::load_from(&config_path)?;

        Ok(Config {
            db_path: data_dir.join(DATABASE_FILE_NAME),
            local_storage_path: data_dir.join(LOCAL_STORAGE_FILE_NAME),
            settings,
        })
    }
}

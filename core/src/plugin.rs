//! Runtime-loaded feature modules ("remotes").
//!
//! A remote publishes a JSON manifest (`remoteEntry.json`) listing the modules it
//! exposes. The host resolves the `./Component` export into a [`ComponentFactory`]
//! and tracks a load state per remote. Fetching is behind [`PluginLoader`] so the
//! HTTP client stays out of this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub const COMPONENT_EXPORT: &str = "./Component";
pub const PRODUCTION_FALLBACK_URL: &str = "http://localhost:4200/remoteEntry.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Unknown remote module '{0}'")]
    UnknownRemote(String),
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("Invalid manifest at {url}: {message}")]
    InvalidManifest { url: String, message: String },
    #[error("Remote '{remote}' does not expose '{export}'")]
    MissingExport { remote: String, export: String },
    #[error("Failed to mount '{remote}': {message}")]
    Mount { remote: String, message: String },
    #[error("Remote '{0}' has not failed; nothing to retry")]
    NotRetryable(String),
}

// --- Manifest ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposedModule {
    pub key: String,
    pub out_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntryManifest {
    pub name: String,
    #[serde(default)]
    pub exposes: Vec<ExposedModule>,
    #[serde(default)]
    pub shared: Vec<serde_json::Value>,
}

pub fn parse_manifest(url: &str, body: &str) -> Result<RemoteEntryManifest, LoadError> {
    serde_json::from_str(body).map_err(|e| LoadError::InvalidManifest {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Resolve `file` relative to the directory of `manifest_url`.
#[must_use]
pub fn resolve_module_url(manifest_url: &str, file: &str) -> String {
    if file.starts_with("http://") || file.starts_with("https://") {
        return file.to_string();
    }
    let file = file.trim_start_matches("./");
    match manifest_url.rfind('/') {
        Some(idx) => format!("{}/{file}", &manifest_url[..idx]),
        None => file.to_string(),
    }
}

/// A resolved, not yet mounted, component from a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFactory {
    pub remote_name: String,
    pub exposed_module: String,
    pub module_url: String,
}

/// Somewhere a loaded component can be attached.
pub trait MountPoint {
    fn mount(&mut self, component: &ComponentFactory) -> anyhow::Result<()>;
}

impl ComponentFactory {
    pub fn from_manifest(
        manifest_url: &str,
        manifest: &RemoteEntryManifest,
        export: &str,
    ) -> Result<Self, LoadError> {
        let exposed = manifest
            .exposes
            .iter()
            .find(|m| m.key == export)
            .ok_or_else(|| LoadError::MissingExport {
                remote: manifest.name.clone(),
                export: export.to_string(),
            })?;
        Ok(Self {
            remote_name: manifest.name.clone(),
            exposed_module: exposed.key.clone(),
            module_url: resolve_module_url(manifest_url, &exposed.out_file_name),
        })
    }

    pub fn instantiate(&self, target: &mut dyn MountPoint) -> Result<(), LoadError> {
        target.mount(self).map_err(|e| LoadError::Mount {
            remote: self.remote_name.clone(),
            message: format!("{e:#}"),
        })
    }
}

#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Fetch the manifest at `manifest_url` and resolve its component export.
    async fn load_plugin(&self, manifest_url: &str) -> Result<ComponentFactory, LoadError>;
}

// --- Registry ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDefinition {
    pub name: String,
    pub dev_port: u16,
    pub production_url: Option<String>,
}

impl RemoteDefinition {
    pub fn new(name: &str, dev_port: u16, production_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            dev_port,
            production_url: production_url.map(str::to_string),
        }
    }
}

#[must_use]
pub fn default_remotes() -> Vec<RemoteDefinition> {
    vec![
        RemoteDefinition::new("fitlog-fasting-tracker", 4206, None),
        RemoteDefinition::new(
            "fitlog-streaks",
            4203,
            Some("https://fitlog-streaks.netlify.app/remoteEntry.json"),
        ),
        RemoteDefinition::new(
            "fitlog-ai-insights",
            4204,
            Some("https://fitlog-ai-insights.netlify.app/remoteEntry.json"),
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    production: bool,
    remotes: Vec<RemoteDefinition>,
}

impl RemoteRegistry {
    #[must_use]
    pub fn new(production: bool, remotes: Vec<RemoteDefinition>) -> Self {
        Self {
            production,
            remotes,
        }
    }

    #[must_use]
    pub fn remotes(&self) -> &[RemoteDefinition] {
        &self.remotes
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteDefinition> {
        self.remotes.iter().find(|r| r.name == name)
    }

    /// Manifest URL for `name`: localhost in development, the configured URL (or
    /// the shell's own origin) in production.
    #[must_use]
    pub fn entry_url(&self, name: &str) -> Option<String> {
        let remote = self.get(name)?;
        Some(if self.production {
            remote
                .production_url
                .clone()
                .unwrap_or_else(|| PRODUCTION_FALLBACK_URL.to_string())
        } else {
            format!("http://localhost:{}/remoteEntry.json", remote.dev_port)
        })
    }
}

// --- Host ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Idle,
    Loading,
    Loaded(ComponentFactory),
    Failed(LoadError),
}

impl RemoteState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RemoteState::Idle => "idle",
            RemoteState::Loading => "loading",
            RemoteState::Loaded(_) => "loaded",
            RemoteState::Failed(_) => "failed",
        }
    }
}

/// Loads remotes on demand and remembers how each attempt went.
///
/// No automatic retry: a failed remote stays failed until [`retry`](Self::retry).
pub struct RemoteModuleHost {
    loader: Arc<dyn PluginLoader>,
    registry: RemoteRegistry,
    states: Mutex<HashMap<String, RemoteState>>,
}

impl RemoteModuleHost {
    pub fn new(loader: Arc<dyn PluginLoader>, registry: RemoteRegistry) -> Self {
        Self {
            loader,
            registry,
            states: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &RemoteRegistry {
        &self.registry
    }

    #[must_use]
    pub fn state(&self, name: &str) -> RemoteState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or(RemoteState::Idle)
    }

    fn set_state(&self, name: &str, state: RemoteState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), state);
    }

    /// Load `name`, reusing an earlier successful load.
    pub async fn load(&self, name: &str) -> Result<ComponentFactory, LoadError> {
        if let RemoteState::Loaded(factory) = self.state(name) {
            return Ok(factory);
        }
        let Some(url) = self.registry.entry_url(name) else {
            return Err(LoadError::UnknownRemote(name.to_string()));
        };

        self.set_state(name, RemoteState::Loading);
        info!(remote = name, url = %url, "loading remote module");
        match self.loader.load_plugin(&url).await {
            Ok(factory) => {
                self.set_state(name, RemoteState::Loaded(factory.clone()));
                Ok(factory)
            }
            Err(e) => {
                error!(remote = name, error = %e, "failed to load remote module");
                self.set_state(name, RemoteState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    pub async fn retry(&self, name: &str) -> Result<ComponentFactory, LoadError> {
        match self.state(name) {
            RemoteState::Failed(_) => {
                self.set_state(name, RemoteState::Idle);
                self.load(name).await
            }
            _ => Err(LoadError::NotRetryable(name.to_string())),
        }
    }
}

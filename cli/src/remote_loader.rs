use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use fitlog_core::plugin::{
    COMPONENT_EXPORT, ComponentFactory, LoadError, MountPoint, PluginLoader, parse_manifest,
};

/// Fetches `remoteEntry.json` manifests over HTTP.
pub struct HttpPluginLoader {
    client: reqwest::Client,
}

impl HttpPluginLoader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fitlog-cli/{} (weight tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String, LoadError> {
        let fetch_error = |message: String| LoadError::Fetch {
            url: url.to_string(),
            message,
        };
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {status}")));
        }
        resp.text().await.map_err(|e| fetch_error(e.to_string()))
    }
}

#[async_trait]
impl PluginLoader for HttpPluginLoader {
    async fn load_plugin(&self, manifest_url: &str) -> Result<ComponentFactory, LoadError> {
        let body = self.fetch(manifest_url).await?;
        let manifest = parse_manifest(manifest_url, &body)?;
        ComponentFactory::from_manifest(manifest_url, &manifest, COMPONENT_EXPORT)
    }
}

/// Mount target for a terminal; unless quiet, reports the attached component on stdout.
pub struct ConsoleMount {
    echo: bool,
}

impl ConsoleMount {
    pub fn new(echo: bool) -> Self {
        Self { echo }
    }
}

impl MountPoint for ConsoleMount {
    fn mount(&mut self, component: &ComponentFactory) -> Result<()> {
        if self.echo {
            println!(
                "Mounted {} {} from {}",
                component.remote_name, component.exposed_module, component.module_url
            );
        }
        Ok(())
    }
}

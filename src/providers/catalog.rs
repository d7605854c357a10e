//! REST-backed catalog provider.
//!
//! Deliberately thin: one collection endpoint per resource kind, JSON in and
//! out, remote ids captured from response bodies. State lives in a local
//! JSON file next to the config.

use crate::config::Config;
use crate::provider::Provider;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use resgraph::{PropertyValue, ResourceData, ResourceState, State, Urn};
use std::path::{Path, PathBuf};

pub struct CatalogProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    state_path: PathBuf,
}

impl CatalogProvider {
    pub fn new(config: &Config) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            bail!("api_url is not configured");
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            state_path: config.state_path()?,
        })
    }

    fn collection_url(&self, kind: &str) -> String {
        format!("{}/v1/{kind}s", self.base_url)
    }

    fn resource_url(&self, kind: &str, remote_id: &str) -> String {
        format!("{}/{remote_id}", self.collection_url(kind))
    }
}

#[async_trait]
impl Provider for CatalogProvider {
    async fn load_state(&self) -> Result<State> {
        read_state(&self.state_path)
    }

    async fn save_state(&self, state: &State) -> Result<()> {
        write_state(&self.state_path, state)
    }

    async fn create(&self, urn: &Urn, data: &ResourceData) -> Result<ResourceData> {
        let response = self
            .client
            .post(self.collection_url(urn.kind()))
            .bearer_auth(&self.token)
            .json(&data_to_json(data))
            .send()
            .await
            .with_context(|| format!("create request for {urn} failed"))?
            .error_for_status()
            .with_context(|| format!("create for {urn} was rejected"))?;

        let body: serde_json::Value = response.json().await?;
        json_to_data(body)
    }

    async fn update(
        &self,
        urn: &Urn,
        data: &ResourceData,
        current: &ResourceState,
    ) -> Result<ResourceData> {
        let remote_id = remote_id(urn, current)?;
        let response = self
            .client
            .put(self.resource_url(urn.kind(), remote_id))
            .bearer_auth(&self.token)
            .json(&data_to_json(data))
            .send()
            .await
            .with_context(|| format!("update request for {urn} failed"))?
            .error_for_status()
            .with_context(|| format!("update for {urn} was rejected"))?;

        let body: serde_json::Value = response.json().await?;
        json_to_data(body)
    }

    async fn delete(&self, urn: &Urn, current: &ResourceState) -> Result<()> {
        let remote_id = remote_id(urn, current)?;
        let response = self
            .client
            .delete(self.resource_url(urn.kind(), remote_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("delete request for {urn} failed"))?;

        // Already gone is fine for a delete.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            log::debug!("{urn} was already deleted remotely");
            return Ok(());
        }
        response
            .error_for_status()
            .with_context(|| format!("delete for {urn} was rejected"))?;
        Ok(())
    }

    async fn import_resource(&self, urn: &Urn, remote_id: &str) -> Result<ResourceData> {
        let response = self
            .client
            .get(self.resource_url(urn.kind(), remote_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("import request for {urn} failed"))?
            .error_for_status()
            .with_context(|| format!("import for {urn} was rejected"))?;

        let body: serde_json::Value = response.json().await?;
        json_to_data(body)
    }
}

fn remote_id<'a>(urn: &Urn, current: &'a ResourceState) -> Result<&'a str> {
    current
        .output
        .get("id")
        .and_then(PropertyValue::as_str)
        .with_context(|| format!("no remote id recorded for {urn}"))
}

fn data_to_json(data: &ResourceData) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (key, value) in data {
        out.insert(key.clone(), value.to_json());
    }
    serde_json::Value::Object(out)
}

fn json_to_data(body: serde_json::Value) -> Result<ResourceData> {
    let serde_json::Value::Object(entries) = body else {
        bail!("expected a JSON object response");
    };
    let mut out = ResourceData::new();
    for (key, value) in entries {
        out.insert(key, PropertyValue::from_json(value));
    }
    Ok(out)
}

fn read_state(path: &Path) -> Result<State> {
    if !path.exists() {
        return Ok(State::empty());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    Ok(State::from_json(&raw)?)
}

fn write_state(path: &Path, state: &State) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, state.to_json()?)
        .with_context(|| format!("Could not write {}", path.display()))
}

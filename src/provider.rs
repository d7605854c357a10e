//! Boundary between the sync engine and a concrete catalog backend.

use anyhow::Result;
use async_trait::async_trait;
use resgraph::{ResourceData, ResourceState, State, Urn};

/// A backend that can read and write catalog resources.
///
/// Input data handed to `create`/`update` is already dereferenced; providers
/// never see an unresolved reference. The returned data becomes the
/// resource's recorded output (remote ids and derived fields).
#[async_trait]
pub trait Provider: Send + Sync {
    async fn load_state(&self) -> Result<State>;

    async fn save_state(&self, state: &State) -> Result<()>;

    async fn create(&self, urn: &Urn, data: &ResourceData) -> Result<ResourceData>;

    async fn update(
        &self,
        urn: &Urn,
        data: &ResourceData,
        current: &ResourceState,
    ) -> Result<ResourceData>;

    async fn delete(&self, urn: &Urn, current: &ResourceState) -> Result<()>;

    /// Adopt an existing remote resource into state without mutating it.
    async fn import_resource(&self, urn: &Urn, remote_id: &str) -> Result<ResourceData>;
}

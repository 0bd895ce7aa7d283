//! `Info.plist` metadata of bundles and account containers.

use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::constants::INFO_PLIST;
use crate::error::{IngestError, IngestResult};

/// Metadata of a `.calendar` bundle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BundleInfo {
    pub title: String,
    /// Stable identifier of the calendar
    pub key: String,
}

/// Metadata of a `.caldav` / `.exchange` account container.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInfo {
    pub title: String,
}

impl BundleInfo {
    pub async fn load(bundle_dir: &Path) -> IngestResult<Self> {
        read_info(bundle_dir).await
    }
}

impl ContainerInfo {
    pub async fn load(container_dir: &Path) -> IngestResult<Self> {
        read_info(container_dir).await
    }
}

async fn read_info<T: DeserializeOwned>(dir: &Path) -> IngestResult<T> {
    let path = dir.join(INFO_PLIST);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| IngestError::io(&path, e))?;

    plist::from_bytes(&bytes).map_err(|source| IngestError::Metadata { path, source })
}

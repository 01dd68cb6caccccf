//! Cluster and provider data model.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::engine::EngineState;

/// Infrastructure backend a cluster is provisioned on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    Gcp,
    Aws,
    Azure,
    Gardener,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Backend-independent cluster phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Phase {
    Pending,
    Provisioning,
    Provisioned,
    Errored,
    #[default]
    Unknown,
}

/// Status of a cluster as last observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub phase: Phase,
}

impl ClusterStatus {
    pub fn new(phase: Phase) -> Self {
        Self { phase }
    }
}

/// Information produced by a provisioning call.
///
/// `internal_state` is the engine's snapshot of what was created. It is
/// kept even when the call failed so the caller can retry or clean up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub endpoint: String,
    /// Raw CA bytes, stored base64 encoded in the cluster record.
    #[serde(default, with = "crate::serde_helpers::base64_bytes")]
    pub certificate_authority_data: Vec<u8>,
    #[serde(default)]
    pub internal_state: EngineState,
    #[serde(default)]
    pub status: ClusterStatus,
}

/// Desired shape of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Must start with a lowercase letter, at most 20 characters, no trailing hyphen.
    pub name: String,
    pub node_count: i64,
    pub machine_type: String,
    pub kubernetes_version: String,
    /// Size of each node's disk in GB.
    pub disk_size_gb: i64,
    pub location: String,
    /// Present once the cluster has been provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_info: Option<ClusterInfo>,
}

/// Where and with which credentials a cluster is provisioned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Credentials file read by the engine plugin (a kubeconfig for Gardener).
    pub credentials_file_path: Utf8PathBuf,
    pub project_name: String,
    /// Backend-specific settings, validated per provider type.
    #[serde(default)]
    pub custom_configurations: BTreeMap<String, String>,
}

impl Provider {
    /// Resolves a relative credentials path against the given base directory.
    pub fn resolve_paths(&mut self, base_dir: &Utf8Path) {
        if !self.credentials_file_path.as_str().is_empty() && self.credentials_file_path.is_relative()
        {
            self.credentials_file_path = base_dir.join(&self.credentials_file_path);
        }
    }

    /// Looks up a custom configuration value.
    pub fn custom(&self, key: &str) -> Option<&str> {
        self.custom_configurations.get(key).map(String::as_str)
    }
}

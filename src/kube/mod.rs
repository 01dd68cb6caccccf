//! Boundary to the Kubernetes API.
//!
//! Only three reads are needed: a secret, a labelled pod list and a custom
//! resource. [`KubeError::NotFound`] is kept apart from every other failure
//! because callers give "not found" its own meaning.

mod kubectl;

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::Deserialize;

pub use kubectl::{KubectlClient, KubectlConnector};

/// Failure of a Kubernetes read.
#[derive(Debug, thiserror::Error)]
pub enum KubeError {
    /// The object, or the namespace holding it, does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KubeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Secret with its data values decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

/// Lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub phase: PodPhase,
}

/// Read access to one cluster.
pub trait KubeApi: Send + Sync {
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, KubeError>;

    /// Lists pods in `namespace` matching a label selector such as `name=tiller`.
    fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, KubeError>;

    /// Fetches a custom resource as raw JSON.
    ///
    /// `resource` is the plural resource name, optionally qualified by its
    /// API group (`shoots`, `installations.installer.kyma-project.io`).
    fn get_custom_resource(
        &self,
        resource: &str,
        namespace: &str,
        name: &str,
    ) -> Result<serde_json::Value, KubeError>;
}

/// Opens a [`KubeApi`] from a kubeconfig file.
pub trait KubeConnector: Send + Sync {
    fn connect(&self, kubeconfig: &Utf8Path) -> anyhow::Result<Box<dyn KubeApi>>;
}

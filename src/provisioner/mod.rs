//! Public entry points for cluster lifecycle operations.
//!
//! A [`Provisioner`] composes validation, configuration assembly, the
//! selected [`Operator`](crate::operator::Operator) and status translation.
//! Use [`new_provisioner`] to build one for a provider type.

mod gardener;

use std::sync::Arc;

use anyhow::Result;

use crate::engine::Engine;
use crate::error::HydroformError;
use crate::kube::KubeConnector;
use crate::operator::{OperatorType, new_operator};
use crate::types::{Cluster, ClusterStatus, Provider, ProviderType};

pub use gardener::GardenerProvisioner;

/// Cluster lifecycle operations for one backend.
///
/// Every operation validates its input first and performs no side effect
/// when validation fails.
pub trait Provisioner: Send + Sync {
    /// Creates the cluster and returns a copy with [`ClusterInfo`](crate::types::ClusterInfo)
    /// attached. On failure the input is left untouched; an engine failure
    /// carries the partial state, see [`HydroformError::cluster_info`].
    fn provision(&self, cluster: &Cluster, provider: &Provider) -> Result<Cluster>;

    /// Destroys the cluster recorded in `cluster.cluster_info`.
    fn deprovision(&self, cluster: &Cluster, provider: &Provider) -> Result<()>;

    /// Queries the live backend for the cluster's current phase.
    fn status(&self, cluster: &Cluster, provider: &Provider) -> Result<ClusterStatus>;

    /// Returns the raw kubeconfig of the cluster.
    fn credentials(&self, cluster: &Cluster, provider: &Provider) -> Result<Vec<u8>>;
}

/// Builds the provisioner for `provider_type`, driving the given operator.
pub fn new_provisioner(
    provider_type: ProviderType,
    operator_type: OperatorType,
    engine: Arc<dyn Engine>,
    connector: Arc<dyn KubeConnector>,
) -> Result<Box<dyn Provisioner>> {
    match provider_type {
        ProviderType::Gardener => Ok(Box::new(GardenerProvisioner::new(
            new_operator(operator_type, engine),
            connector,
        ))),
        other => Err(HydroformError::UnsupportedBackend(format!(
            "no provisioner for provider type '{}'",
            other
        ))
        .into()),
    }
}

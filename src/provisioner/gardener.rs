//! Provisioner for Gardener shoots.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::Provisioner;
use crate::configuration::{ConfigMap, gardener_namespace};
use crate::error::HydroformError;
use crate::kube::{KubeApi, KubeConnector, KubeError};
use crate::operator::Operator;
use crate::status;
use crate::types::{Cluster, ClusterStatus, Provider, ProviderType};
use crate::validation::validate;

const SHOOT_RESOURCE: &str = "shoots";
const KUBECONFIG_KEY: &str = "kubeconfig";
const LAST_OPERATION_STATE: &str = "/status/lastOperation/state";

/// Provisions Gardener shoots through an [`Operator`] and reads their
/// status and credentials from the Gardener project namespace.
pub struct GardenerProvisioner {
    operator: Box<dyn Operator>,
    connector: Arc<dyn KubeConnector>,
}

impl GardenerProvisioner {
    pub fn new(operator: Box<dyn Operator>, connector: Arc<dyn KubeConnector>) -> Self {
        Self {
            operator,
            connector,
        }
    }

    /// Connects to the Gardener project with the provider's credentials file.
    fn gardener_api(&self, provider: &Provider) -> Result<Box<dyn KubeApi>> {
        self.connector
            .connect(&provider.credentials_file_path)
            .context("unable to create gardener client")
    }
}

fn lookup_error(context: String, err: KubeError) -> HydroformError {
    HydroformError::ExternalLookup {
        context,
        message: format!("{:#}", anyhow::Error::from(err)),
    }
}

impl Provisioner for GardenerProvisioner {
    fn provision(&self, cluster: &Cluster, provider: &Provider) -> Result<Cluster> {
        validate(cluster, provider)?;
        let config = ConfigMap::for_gardener(cluster, provider)?;

        info!(
            cluster = %cluster.name,
            project = %provider.project_name,
            "provisioning gardener cluster"
        );
        let cluster_info = self
            .operator
            .create(ProviderType::Gardener, &config)
            .context("unable to provision gardener cluster")?;

        Ok(Cluster {
            cluster_info: Some(cluster_info),
            ..cluster.clone()
        })
    }

    fn deprovision(&self, cluster: &Cluster, provider: &Provider) -> Result<()> {
        validate(cluster, provider)?;
        let state = match &cluster.cluster_info {
            Some(info) if !info.internal_state.is_empty() => &info.internal_state,
            _ => return Err(HydroformError::MissingState(cluster.name.clone()).into()),
        };
        let config = ConfigMap::for_gardener(cluster, provider)?;

        info!(
            cluster = %cluster.name,
            project = %provider.project_name,
            "deprovisioning gardener cluster"
        );
        self.operator
            .delete(state, ProviderType::Gardener, &config)
            .context("unable to deprovision gardener cluster")
    }

    fn status(&self, cluster: &Cluster, provider: &Provider) -> Result<ClusterStatus> {
        validate(cluster, provider)?;
        let api = self.gardener_api(provider)?;
        let namespace = gardener_namespace(&provider.project_name);

        let shoot = api
            .get_custom_resource(SHOOT_RESOURCE, &namespace, &cluster.name)
            .map_err(|e| {
                lookup_error(format!("unable to get shoot {}/{}", namespace, cluster.name), e)
            })?;
        let native = shoot.pointer(LAST_OPERATION_STATE).and_then(|v| v.as_str());
        let status = status::cluster_status(native);
        info!(
            cluster = %cluster.name,
            native = ?native,
            phase = %status.phase,
            "gardener cluster status"
        );
        Ok(status)
    }

    fn credentials(&self, cluster: &Cluster, provider: &Provider) -> Result<Vec<u8>> {
        validate(cluster, provider)?;
        let api = self.gardener_api(provider)?;
        let namespace = gardener_namespace(&provider.project_name);
        let secret_name = format!("{}.kubeconfig", cluster.name);
        let context = format!("unable to get secret {}/{}", namespace, secret_name);

        let mut secret = api
            .get_secret(&namespace, &secret_name)
            .map_err(|e| lookup_error(context.clone(), e))?;
        let kubeconfig = secret.data.remove(KUBECONFIG_KEY).ok_or_else(|| {
            HydroformError::ExternalLookup {
                context,
                message: format!("secret has no '{}' key", KUBECONFIG_KEY),
            }
        })?;
        Ok(kubeconfig)
    }
}

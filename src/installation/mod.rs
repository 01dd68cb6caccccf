//! Readiness checks for an application installed on a provisioned cluster.
//!
//! Every check is a single read. Polling cadence and retries belong to the
//! caller.

use std::fmt;

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Deserialize;
use tracing::debug;

use crate::kube::{KubeApi, KubeConnector, KubeError, PodPhase};

pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";
pub const TILLER_LABEL_SELECTOR: &str = "name=tiller";
pub const INSTALLATION_RESOURCE: &str = "installations.installer.kyma-project.io";
pub const INSTALLATION_NAME: &str = "kyma-installation";
pub const INSTALLATION_NAMESPACE: &str = "default";

/// State reported when the resource exists but no installation ran yet.
pub const NO_INSTALLATION_STATE: &str = "NoInstallation";

const ERROR_STATE: &str = "Error";

/// Current state of the installation resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationState {
    pub state: String,
    pub description: String,
}

/// One entry of the resource's error log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorLogEntry {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub occurrences: u32,
}

impl fmt::Display for ErrorLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component: {}, error: {}, occurrences: {}",
            self.component, self.log, self.occurrences
        )
    }
}

/// Failure to determine the installation state.
#[derive(Debug, thiserror::Error)]
pub enum InstallationError {
    /// The resource could not be fetched.
    #[error(transparent)]
    Lookup(#[from] KubeError),

    /// The resource is in the `Error` state.
    #[error("installation error occurred: {description}{}", format_entries(.entries))]
    Failed {
        description: String,
        entries: Vec<ErrorLogEntry>,
    },

    #[error("malformed installation resource: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn format_entries(entries: &[ErrorLogEntry]) -> String {
    entries.iter().map(|entry| format!("\n- {}", entry)).collect()
}

#[derive(Debug, Default, Deserialize)]
struct InstallationResource {
    #[serde(default)]
    status: InstallationStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallationStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    error_log: Vec<ErrorLogEntry>,
}

/// Answers whether the target application is deployed and running.
pub struct InstallationChecker {
    api: Box<dyn KubeApi>,
}

impl InstallationChecker {
    pub fn new(api: Box<dyn KubeApi>) -> Self {
        Self { api }
    }

    /// Connects to the cluster described by `kubeconfig`.
    pub fn connect(connector: &dyn KubeConnector, kubeconfig: &Utf8Path) -> Result<Self> {
        let api = connector
            .connect(kubeconfig)
            .context("failed to create kubernetes client")?;
        Ok(Self::new(api))
    }

    /// Whether any tiller pod exists. A missing namespace means not deployed.
    pub fn is_deployed(&self) -> Result<bool> {
        match self.api.list_pods(KUBE_SYSTEM_NAMESPACE, TILLER_LABEL_SELECTOR) {
            Ok(pods) => Ok(!pods.is_empty()),
            Err(KubeError::NotFound(message)) => {
                debug!("tiller pods not found: {}", message);
                Ok(false)
            }
            Err(err) => Err(err).context("error listing tiller pods"),
        }
    }

    /// Whether tiller pods exist and every one of them is running.
    ///
    /// An empty list is "not ready yet"; a not-found response is an error,
    /// since the pods were expected to exist.
    pub fn is_ready(&self) -> Result<bool> {
        let pods = match self.api.list_pods(KUBE_SYSTEM_NAMESPACE, TILLER_LABEL_SELECTOR) {
            Ok(pods) => pods,
            Err(err @ KubeError::NotFound(_)) => {
                return Err(err).context("error no tiller pods found");
            }
            Err(err) => return Err(err).context("error listing tiller pods"),
        };
        if pods.is_empty() {
            return Ok(false);
        }
        Ok(pods.iter().all(|pod| pod.phase == PodPhase::Running))
    }

    /// Reads the state of the installation resource.
    pub fn check_installation_state(&self) -> Result<InstallationState, InstallationError> {
        let raw = self.api.get_custom_resource(
            INSTALLATION_RESOURCE,
            INSTALLATION_NAMESPACE,
            INSTALLATION_NAME,
        )?;
        installation_state(serde_json::from_value(raw)?)
    }
}

fn installation_state(
    resource: InstallationResource,
) -> Result<InstallationState, InstallationError> {
    let status = resource.status;
    match status.state.as_str() {
        "" => Ok(InstallationState {
            state: NO_INSTALLATION_STATE.to_string(),
            description: String::new(),
        }),
        ERROR_STATE => Err(InstallationError::Failed {
            description: status.description,
            entries: status.error_log,
        }),
        _ => Ok(InstallationState {
            state: status.state,
            description: status.description,
        }),
    }
}

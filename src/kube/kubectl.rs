//! [`KubeApi`] backed by the `kubectl` command.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{KubeApi, KubeConnector, KubeError, Pod, PodPhase, Secret};
use crate::error::HydroformError;
use crate::executor::{CommandExecutor, CommandSpec};

/// Marker kubectl prints on stderr for a missing object or namespace.
const NOT_FOUND_MARKER: &str = "(NotFound)";

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SecretObject {
    metadata: Metadata,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodObject>,
}

#[derive(Debug, Deserialize)]
struct PodObject {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: PodPhase,
}

/// Opens [`KubectlClient`]s sharing one executor.
pub struct KubectlConnector {
    executor: Arc<dyn CommandExecutor>,
    binary: String,
}

impl KubectlConnector {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            binary: "kubectl".to_string(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl KubeConnector for KubectlConnector {
    fn connect(&self, kubeconfig: &Utf8Path) -> anyhow::Result<Box<dyn KubeApi>> {
        let metadata = fs::metadata(kubeconfig).map_err(|e| {
            HydroformError::io(format!("failed to read kubeconfig {}", kubeconfig), e)
        })?;
        if !metadata.is_file() {
            return Err(
                HydroformError::Config(format!("kubeconfig {} is not a file", kubeconfig)).into()
            );
        }
        Ok(Box::new(KubectlClient {
            executor: Arc::clone(&self.executor),
            binary: self.binary.clone(),
            kubeconfig: kubeconfig.to_path_buf(),
        }))
    }
}

/// Runs `kubectl get ... -o json` against one kubeconfig.
pub struct KubectlClient {
    executor: Arc<dyn CommandExecutor>,
    binary: String,
    kubeconfig: Utf8PathBuf,
}

impl KubectlClient {
    fn get<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, KubeError> {
        let mut full_args = vec![
            "--kubeconfig".to_string(),
            self.kubeconfig.to_string(),
            "get".to_string(),
        ];
        full_args.extend(args.iter().map(|arg| arg.to_string()));
        full_args.extend(["-o".to_string(), "json".to_string()]);

        let spec = CommandSpec::new(self.binary.clone(), full_args).with_captured_output();
        debug!("running {}", spec.display());

        let result = self
            .executor
            .execute(&spec)
            .with_context(|| format!("failed to execute {}", self.binary))?;
        if !result.success() {
            let stderr = result.stderr_lossy();
            if stderr.contains(NOT_FOUND_MARKER) {
                return Err(KubeError::NotFound(stderr.trim().to_string()));
            }
            let status = match result.code() {
                Some(code) => format!("exit code {}: {}", code, stderr.trim()),
                None => format!("terminated by signal: {}", stderr.trim()),
            };
            return Err(anyhow::Error::from(HydroformError::Execution {
                command: spec.display(),
                status,
            })
            .into());
        }

        let parsed = serde_json::from_slice(&result.stdout)
            .with_context(|| format!("failed to parse output of {}", spec.display()))?;
        Ok(parsed)
    }
}

impl KubeApi for KubectlClient {
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, KubeError> {
        let object: SecretObject = self.get(&["secret", name, "-n", namespace])?;
        let mut data = BTreeMap::new();
        for (key, value) in object.data {
            let bytes = STANDARD.decode(value.trim()).with_context(|| {
                format!("secret {}/{} key '{}' is not valid base64", namespace, name, key)
            })?;
            data.insert(key, bytes);
        }
        Ok(Secret {
            name: object.metadata.name,
            data,
        })
    }

    fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, KubeError> {
        let list: PodList = self.get(&["pods", "-n", namespace, "-l", label_selector])?;
        Ok(list
            .items
            .into_iter()
            .map(|pod| Pod {
                name: pod.metadata.name,
                phase: pod.status.phase,
            })
            .collect())
    }

    fn get_custom_resource(
        &self,
        resource: &str,
        namespace: &str,
        name: &str,
    ) -> Result<serde_json::Value, KubeError> {
        self.get(&[resource, name, "-n", namespace])
    }
}

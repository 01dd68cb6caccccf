//! Engine-backed operator: the apply/destroy driver.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use super::Operator;
use crate::configuration::ConfigMap;
use crate::engine::{ApplyFailure, Engine, EngineState, Platform, ProviderPlugin};
use crate::error::HydroformError;
use crate::template::{self, Document};
use crate::types::{ClusterInfo, ClusterStatus, Phase, ProviderType};

const ENDPOINT_OUTPUT: &str = "endpoint";
const CA_CERTIFICATE_OUTPUT: &str = "cluster_ca_certificate";

/// How the engine-backed operator produces a document for a provider type.
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    /// The same document for every call.
    Static {
        document: fn() -> Document,
        plugin: ProviderPlugin,
    },
    /// A document generated from the configuration on every call.
    Generated {
        render: fn(&ConfigMap) -> Result<Document, HydroformError>,
        plugin: ProviderPlugin,
    },
    /// No working implementation, with the reason reported to the caller.
    Unsupported(&'static str),
}

/// Looks up the backend registered for `provider_type`.
///
/// `Gcp` is available to library callers driving [`TerraformOperator`]
/// directly with [`ConfigMap::for_gcp`]. The provisioner only builds
/// Gardener clusters.
pub fn backend_for(provider_type: ProviderType) -> Backend {
    match provider_type {
        ProviderType::Gcp => Backend::Static {
            document: template::gcp::document,
            plugin: ProviderPlugin::GOOGLE,
        },
        ProviderType::Gardener => Backend::Generated {
            render: template::gardener::render,
            plugin: ProviderPlugin::GARDENER,
        },
        ProviderType::Aws => Backend::Unsupported("aws not supported yet"),
        ProviderType::Azure => Backend::Unsupported("azure not supported yet"),
        ProviderType::Unknown => Backend::Unsupported("unknown provider"),
    }
}

/// [`Operator`] that drives an [`Engine`].
pub struct TerraformOperator {
    engine: Arc<dyn Engine>,
}

impl TerraformOperator {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Builds the execution context: document, plugin, and every binding.
    fn new_platform(
        &self,
        provider_type: ProviderType,
        config: &ConfigMap,
    ) -> Result<Platform, HydroformError> {
        let (document, plugin) = match backend_for(provider_type) {
            Backend::Static { document, plugin } => {
                let document = document();
                document.check_bindings(config)?;
                (document, plugin)
            }
            Backend::Generated { render, plugin } => (render(config)?, plugin),
            Backend::Unsupported(reason) => {
                return Err(HydroformError::UnsupportedBackend(reason.to_string()));
            }
        };
        debug!("infrastructure document for {}:\n{}", provider_type, document);

        let mut platform = Platform::new(document, plugin)?;
        platform.bind_all(config);
        Ok(platform)
    }
}

impl Operator for TerraformOperator {
    fn create(&self, provider_type: ProviderType, config: &ConfigMap) -> Result<ClusterInfo> {
        let platform = self.new_platform(provider_type, config)?;

        info!(provider = %provider_type, "creating cluster");
        let output = match self.engine.apply(&platform, &EngineState::empty(), false) {
            Ok(output) => output,
            Err(ApplyFailure { state, source }) => {
                return Err(HydroformError::Apply {
                    info: Box::new(errored(state)),
                    source,
                })
                .context("unable to provision cluster");
            }
        };

        let certificate_authority_data = match output.outputs.get(CA_CERTIFICATE_OUTPUT) {
            Some(value) => match STANDARD.decode(output_string(value)) {
                Ok(bytes) => bytes,
                Err(source) => {
                    return Err(HydroformError::OutputDecode {
                        info: Box::new(errored(output.state)),
                        source,
                    }
                    .into());
                }
            },
            None => Vec::new(),
        };
        let endpoint = endpoint(&output.outputs);

        info!(provider = %provider_type, endpoint = %endpoint, "cluster created");
        Ok(ClusterInfo {
            endpoint,
            certificate_authority_data,
            internal_state: output.state,
            status: ClusterStatus::new(Phase::Provisioned),
        })
    }

    fn delete(
        &self,
        state: &EngineState,
        provider_type: ProviderType,
        config: &ConfigMap,
    ) -> Result<()> {
        let platform = self.new_platform(provider_type, config)?;

        info!(provider = %provider_type, "deleting cluster");
        self.engine
            .apply(&platform, state, true)
            .map_err(|ApplyFailure { state, source }| HydroformError::Apply {
                info: Box::new(errored(state)),
                source,
            })
            .context("unable to deprovision cluster")?;
        info!(provider = %provider_type, "cluster deleted");
        Ok(())
    }
}

fn errored(state: EngineState) -> ClusterInfo {
    ClusterInfo {
        internal_state: state,
        status: ClusterStatus::new(Phase::Errored),
        ..ClusterInfo::default()
    }
}

/// String form of an output value; JSON strings lose their quotes.
fn output_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn endpoint(outputs: &BTreeMap<String, serde_json::Value>) -> String {
    outputs.get(ENDPOINT_OUTPUT).map(output_string).unwrap_or_default()
}

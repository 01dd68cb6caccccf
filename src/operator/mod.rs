//! Operators: create and delete clusters on one infrastructure backend.
//!
//! An [`OperatorType`] picks the implementation once, when a provisioner is
//! built. [`OperatorType::Unknown`] maps to [`UnknownOperator`], which fails
//! every call instead of falling back to a working backend.

mod terraform;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::configuration::ConfigMap;
use crate::engine::{Engine, EngineState};
use crate::error::HydroformError;
use crate::types::{ClusterInfo, ProviderType};

pub use terraform::{Backend, TerraformOperator, backend_for};

/// Available operator implementations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperatorType {
    /// Drives the declarative infrastructure engine.
    #[default]
    Terraform,
    Unknown,
}

/// Create/delete capability bound to one infrastructure backend.
pub trait Operator: Send + Sync {
    /// Creates a cluster and reports where it can be reached.
    ///
    /// When the engine fails, the returned error downcasts to
    /// [`HydroformError::Apply`] and carries the state the engine reached.
    fn create(&self, provider_type: ProviderType, config: &ConfigMap) -> Result<ClusterInfo>;

    /// Destroys the infrastructure recorded in `state`.
    fn delete(
        &self,
        state: &EngineState,
        provider_type: ProviderType,
        config: &ConfigMap,
    ) -> Result<()>;
}

/// Operator returned for an unrecognized operator type.
#[derive(Debug, Default)]
pub struct UnknownOperator;

impl Operator for UnknownOperator {
    fn create(&self, _provider_type: ProviderType, _config: &ConfigMap) -> Result<ClusterInfo> {
        Err(HydroformError::UnsupportedBackend("unknown operator".to_string()).into())
    }

    fn delete(
        &self,
        _state: &EngineState,
        _provider_type: ProviderType,
        _config: &ConfigMap,
    ) -> Result<()> {
        Err(HydroformError::UnsupportedBackend("unknown operator".to_string()).into())
    }
}

/// Builds the operator for `operator_type`.
pub fn new_operator(operator_type: OperatorType, engine: Arc<dyn Engine>) -> Box<dyn Operator> {
    match operator_type {
        OperatorType::Terraform => Box::new(TerraformOperator::new(engine)),
        OperatorType::Unknown => Box::new(UnknownOperator),
    }
}

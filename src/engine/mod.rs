//! Boundary to the declarative infrastructure engine.
//!
//! The engine is a black box: given a [`Platform`] (document, one provider
//! plugin, variable bindings), a prior [`EngineState`] and a destroy flag, it
//! applies the document and returns the new state plus its output map.
//!
//! A failed apply still hands back whatever state the engine reached, in
//! [`ApplyFailure::state`], so partially created infrastructure is never
//! lost.

mod terraform;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::configuration::{ConfigMap, ConfigValue};
use crate::error::HydroformError;
use crate::template::Document;

pub use terraform::TerraformEngine;

/// Engine-owned snapshot of previously created infrastructure.
///
/// Opaque to hydroform: it is stored in the cluster record after a create
/// and handed back unchanged for the matching destroy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineState(serde_json::Value);

impl EngineState {
    /// An empty state, used for the first create.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Resource-provider plugin registered with an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPlugin {
    /// Name the document uses in its `provider "<name>"` block.
    pub name: &'static str,
    /// Registry address the engine installs the plugin from.
    pub source: &'static str,
}

impl ProviderPlugin {
    pub const GOOGLE: Self = Self {
        name: "google",
        source: "hashicorp/google",
    };

    pub const GARDENER: Self = Self {
        name: "gardener",
        source: "kyma-incubator/gardener",
    };
}

/// Execution context: one document, one plugin, and the variable bindings.
#[derive(Debug, Clone)]
pub struct Platform {
    document: Document,
    plugin: ProviderPlugin,
    vars: ConfigMap,
}

impl Platform {
    /// Creates a context for `document`, which must configure `plugin`.
    pub fn new(document: Document, plugin: ProviderPlugin) -> Result<Self, HydroformError> {
        if !document.declares_provider(plugin.name) {
            return Err(HydroformError::Render(format!(
                "document does not configure provider plugin '{}'",
                plugin.name
            )));
        }
        Ok(Self {
            document,
            plugin,
            vars: ConfigMap::new(),
        })
    }

    /// Binds a variable.
    pub fn var(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.vars.insert(key, value);
    }

    /// Binds every entry of `config`.
    pub fn bind_all(&mut self, config: &ConfigMap) {
        for (key, value) in config.iter() {
            self.vars.insert(key.as_str(), value.clone());
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn plugin(&self) -> ProviderPlugin {
        self.plugin
    }

    pub fn vars(&self) -> &ConfigMap {
        &self.vars
    }
}

/// Result of a successful apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutput {
    pub state: EngineState,
    /// Output name to value, as declared by the document's `output` blocks.
    pub outputs: BTreeMap<String, serde_json::Value>,
}

/// A failed apply, with the state the engine left behind.
#[derive(Debug)]
pub struct ApplyFailure {
    pub state: EngineState,
    pub source: anyhow::Error,
}

impl ApplyFailure {
    pub fn new(state: EngineState, source: impl Into<anyhow::Error>) -> Self {
        Self {
            state,
            source: source.into(),
        }
    }
}

/// Declarative apply/destroy engine.
pub trait Engine: Send + Sync {
    /// Applies the platform's document against `prior`.
    ///
    /// With `destroy` set, every resource recorded in `prior` is removed.
    fn apply(
        &self,
        platform: &Platform,
        prior: &EngineState,
        destroy: bool,
    ) -> Result<ApplyOutput, ApplyFailure>;
}

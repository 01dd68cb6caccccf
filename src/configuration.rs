//! Configuration map assembled from cluster and provider definitions.
//!
//! The map is the single set of variable bindings handed to both the
//! template expander and the engine. Backend settings that every Gardener
//! cluster needs are parsed into [`GardenerConfig`] first, so the map is
//! only ever built from checked values. Custom keys hydroform does not
//! know about are passed through unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::HydroformError;
use crate::types::{Cluster, Provider};
use crate::validation::{ValidationErrors, Violation};

/// Configuration keys shared by the validator, the map and the templates.
pub mod keys {
    pub const CLUSTER_NAME: &str = "cluster_name";
    pub const CREDENTIALS_FILE_PATH: &str = "credentials_file_path";
    pub const NODE_COUNT: &str = "node_count";
    pub const MACHINE_TYPE: &str = "machine_type";
    pub const DISK_SIZE: &str = "disk_size";
    pub const KUBERNETES_VERSION: &str = "kubernetes_version";
    pub const LOCATION: &str = "location";
    pub const NAMESPACE: &str = "namespace";
    pub const PROJECT: &str = "project";
    pub const TARGET_PROVIDER: &str = "target_provider";
    pub const TARGET_PROFILE: &str = "target_profile";
    pub const TARGET_SEED: &str = "target_seed";
    pub const TARGET_SECRET: &str = "target_secret";
    pub const DISK_TYPE: &str = "disk_type";
    pub const AUTOSCALER_MIN: &str = "autoscaler_min";
    pub const AUTOSCALER_MAX: &str = "autoscaler_max";
    pub const MAX_SURGE: &str = "max_surge";
    pub const MAX_UNAVAILABLE: &str = "max_unavailable";
    pub const WORKER_CIDR: &str = "workercidr";
    pub const ZONE: &str = "zone";
    pub const PUBLICS_CIDR: &str = "publicscidr";
    pub const VPC_CIDR: &str = "vpccidr";
    pub const INTERNALS_CIDR: &str = "internalscidr";
    pub const VNET_CIDR: &str = "vnetcidr";

    /// Custom keys every Gardener cluster needs, whatever the target provider.
    pub const GARDENER_REQUIRED: &[&str] = &[
        TARGET_SEED,
        TARGET_SECRET,
        DISK_TYPE,
        AUTOSCALER_MIN,
        AUTOSCALER_MAX,
        MAX_SURGE,
        MAX_UNAVAILABLE,
        WORKER_CIDR,
    ];
}

/// Cloud a Gardener shoot runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TargetProvider {
    Gcp,
    Aws,
    Azure,
}

impl TargetProvider {
    /// Gardener cloud profile name for this target.
    pub fn profile(self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
            Self::Aws => "aws",
            Self::Azure => "az",
        }
    }

    /// Custom keys only this target needs.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Gcp => &[keys::ZONE],
            Self::Aws => &[keys::PUBLICS_CIDR, keys::VPC_CIDR, keys::INTERNALS_CIDR, keys::ZONE],
            Self::Azure => &[keys::VNET_CIDR],
        }
    }

    /// Whether shoots on this target declare availability zones.
    pub fn uses_zones(self) -> bool {
        !matches!(self, Self::Azure)
    }
}

/// Target-specific network settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkConfig {
    Gcp {
        zone: String,
    },
    Aws {
        zone: String,
        publics_cidr: String,
        vpc_cidr: String,
        internals_cidr: String,
    },
    Azure {
        vnet_cidr: String,
    },
}

impl NetworkConfig {
    pub fn target(&self) -> TargetProvider {
        match self {
            Self::Gcp { .. } => TargetProvider::Gcp,
            Self::Aws { .. } => TargetProvider::Aws,
            Self::Azure { .. } => TargetProvider::Azure,
        }
    }

    fn bindings(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Gcp { zone } => vec![(keys::ZONE, zone)],
            Self::Aws {
                zone,
                publics_cidr,
                vpc_cidr,
                internals_cidr,
            } => vec![
                (keys::ZONE, zone),
                (keys::PUBLICS_CIDR, publics_cidr),
                (keys::VPC_CIDR, vpc_cidr),
                (keys::INTERNALS_CIDR, internals_cidr),
            ],
            Self::Azure { vnet_cidr } => vec![(keys::VNET_CIDR, vnet_cidr)],
        }
    }
}

/// Gardener settings carried in the provider's custom configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GardenerConfig {
    pub target_seed: String,
    pub target_secret: String,
    pub disk_type: String,
    pub autoscaler_min: String,
    pub autoscaler_max: String,
    pub max_surge: String,
    pub max_unavailable: String,
    pub worker_cidr: String,
    pub network: NetworkConfig,
    /// Custom keys with no typed field, passed to the engine as-is.
    pub extra: BTreeMap<String, String>,
}

/// Typed keys consumed by [`GardenerConfig`]; everything else is `extra`.
const TYPED_KEYS: &[&str] = &[
    keys::TARGET_PROVIDER,
    keys::TARGET_SEED,
    keys::TARGET_SECRET,
    keys::DISK_TYPE,
    keys::AUTOSCALER_MIN,
    keys::AUTOSCALER_MAX,
    keys::MAX_SURGE,
    keys::MAX_UNAVAILABLE,
    keys::WORKER_CIDR,
    keys::ZONE,
    keys::PUBLICS_CIDR,
    keys::VPC_CIDR,
    keys::INTERNALS_CIDR,
    keys::VNET_CIDR,
];

impl GardenerConfig {
    /// Parses the provider's custom configuration.
    ///
    /// Expects input that already passed [`crate::validation::validate`];
    /// any missing key is still reported as a validation error.
    pub fn from_provider(provider: &Provider) -> Result<Self, HydroformError> {
        let custom = &provider.custom_configurations;
        let target = match custom.get(keys::TARGET_PROVIDER) {
            Some(value) => value.parse::<TargetProvider>().map_err(|_| {
                HydroformError::Validation(ValidationErrors::from(vec![Violation::Custom(
                    "Provider.CustomConfigurations['target_provider'] has to be one of: gcp, azure, aws"
                        .to_string(),
                )]))
            })?,
            None => {
                return Err(HydroformError::Validation(ValidationErrors::from(vec![
                    Violation::CannotBeEmpty(
                        "Provider.CustomConfigurations['target_provider']".to_string(),
                    ),
                ])));
            }
        };

        let mut missing = Vec::new();
        let mut take = |key: &str| -> String {
            match custom.get(key) {
                Some(value) => value.clone(),
                None => {
                    missing.push(Violation::CannotBeEmpty(format!(
                        "Provider.CustomConfigurations['{}']",
                        key
                    )));
                    String::new()
                }
            }
        };

        let network = match target {
            TargetProvider::Gcp => NetworkConfig::Gcp {
                zone: take(keys::ZONE),
            },
            TargetProvider::Aws => NetworkConfig::Aws {
                zone: take(keys::ZONE),
                publics_cidr: take(keys::PUBLICS_CIDR),
                vpc_cidr: take(keys::VPC_CIDR),
                internals_cidr: take(keys::INTERNALS_CIDR),
            },
            TargetProvider::Azure => NetworkConfig::Azure {
                vnet_cidr: take(keys::VNET_CIDR),
            },
        };

        let config = Self {
            target_seed: take(keys::TARGET_SEED),
            target_secret: take(keys::TARGET_SECRET),
            disk_type: take(keys::DISK_TYPE),
            autoscaler_min: take(keys::AUTOSCALER_MIN),
            autoscaler_max: take(keys::AUTOSCALER_MAX),
            max_surge: take(keys::MAX_SURGE),
            max_unavailable: take(keys::MAX_UNAVAILABLE),
            worker_cidr: take(keys::WORKER_CIDR),
            network,
            extra: custom
                .iter()
                .filter(|(key, _)| !TYPED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };

        if !missing.is_empty() {
            return Err(HydroformError::Validation(ValidationErrors::from(missing)));
        }
        Ok(config)
    }

    pub fn target(&self) -> TargetProvider {
        self.network.target()
    }
}

/// A configuration value: either text or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Integer(_) => None,
        }
    }

    /// Integer view of the value, parsing text when needed.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::String(value) => value.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Flattened variable bindings for one provisioning call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, ConfigValue>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Returns the value bound to `key` or a render error naming it.
    pub fn require(&self, key: &str) -> Result<&ConfigValue, HydroformError> {
        self.0
            .get(key)
            .ok_or_else(|| HydroformError::MissingVariable(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    /// Builds the bindings for a Gardener shoot.
    pub fn for_gardener(cluster: &Cluster, provider: &Provider) -> Result<Self, HydroformError> {
        let gardener = GardenerConfig::from_provider(provider)?;
        let mut config = Self::base(cluster, provider);
        config.insert(keys::NAMESPACE, gardener_namespace(&provider.project_name));

        for (key, value) in &gardener.extra {
            config.insert(key.as_str(), value.as_str());
        }

        let target = gardener.target();
        config.insert(keys::TARGET_PROVIDER, target.to_string());
        config.insert(keys::TARGET_PROFILE, target.profile());
        config.insert(keys::TARGET_SEED, gardener.target_seed);
        config.insert(keys::TARGET_SECRET, gardener.target_secret);
        config.insert(keys::DISK_TYPE, gardener.disk_type);
        config.insert(keys::AUTOSCALER_MIN, gardener.autoscaler_min);
        config.insert(keys::AUTOSCALER_MAX, gardener.autoscaler_max);
        config.insert(keys::MAX_SURGE, gardener.max_surge);
        config.insert(keys::MAX_UNAVAILABLE, gardener.max_unavailable);
        config.insert(keys::WORKER_CIDR, gardener.worker_cidr);
        for (key, value) in gardener.network.bindings() {
            config.insert(key, value);
        }
        Ok(config)
    }

    /// Builds the bindings for a cluster managed directly on GCP.
    ///
    /// Only library callers reach this backend, through
    /// [`crate::operator::TerraformOperator`]; the provisioner and the CLI
    /// handle Gardener clusters only.
    pub fn for_gcp(cluster: &Cluster, provider: &Provider) -> Self {
        let mut config = Self::base(cluster, provider);
        config.insert(keys::PROJECT, provider.project_name.as_str());
        for (key, value) in &provider.custom_configurations {
            config.insert(key.as_str(), value.as_str());
        }
        config
    }

    fn base(cluster: &Cluster, provider: &Provider) -> Self {
        let mut config = Self::new();
        config.insert(keys::CLUSTER_NAME, cluster.name.as_str());
        config.insert(keys::CREDENTIALS_FILE_PATH, provider.credentials_file_path.as_str());
        config.insert(keys::NODE_COUNT, cluster.node_count);
        config.insert(keys::MACHINE_TYPE, cluster.machine_type.as_str());
        config.insert(keys::DISK_SIZE, cluster.disk_size_gb);
        config.insert(keys::KUBERNETES_VERSION, cluster.kubernetes_version.as_str());
        config.insert(keys::LOCATION, cluster.location.as_str());
        config
    }
}

/// Namespace of a Gardener project.
pub fn gardener_namespace(project_name: &str) -> String {
    format!("garden-{}", project_name)
}

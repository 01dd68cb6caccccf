//! Input validation for cluster and provider definitions.
//!
//! Every rule is checked and every violation is reported, in a fixed order:
//! cluster fields first, then provider fields, then the backend-specific
//! custom configuration keys. Violations are joined with `"; "`.
//!
//! The same check runs before Provision, Deprovision, Status and
//! Credentials, since all of them read backend-specific settings.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::configuration::{TargetProvider, keys};
use crate::error::HydroformError;
use crate::types::{Cluster, Provider};

/// Lowercase letter first, at most 20 characters, no trailing hyphen.
static CLUSTER_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z](?:[-a-z0-9]{0,18}[a-z0-9])?$").expect("cluster name pattern is valid")
});

const CLUSTER_NAME_MESSAGE: &str = "Cluster.Name must start with a lowercase letter followed by up \
    to 19 lowercase letters, numbers, or hyphens, and cannot end with a hyphen";

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A required field is missing or empty.
    CannotBeEmpty(String),
    /// A numeric field is below its minimum.
    CannotBeLess { field: String, min: i64 },
    /// A rule with its own message.
    Custom(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotBeEmpty(field) => write!(f, "{} cannot be empty.", field),
            Self::CannotBeLess { field, min } => write!(f, "{} cannot be less than {}.", field, min),
            Self::Custom(message) => f.write_str(message),
        }
    }
}

/// All violations found by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    fn require(&mut self, present: bool, field: &str) {
        if !present {
            self.push(Violation::CannotBeEmpty(field.to_string()));
        }
    }

    fn into_result(self) -> Result<(), HydroformError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(HydroformError::Validation(self))
        }
    }
}

impl From<Vec<Violation>> for ValidationErrors {
    fn from(violations: Vec<Violation>) -> Self {
        Self(violations)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

fn custom_field(key: &str) -> String {
    format!("Provider.CustomConfigurations['{}']", key)
}

/// Validates a cluster and a Gardener provider definition.
pub fn validate(cluster: &Cluster, provider: &Provider) -> Result<(), HydroformError> {
    let mut errors = ValidationErrors::default();
    validate_cluster(cluster, &mut errors);
    validate_provider(provider, &mut errors);
    validate_custom_configurations(provider, &mut errors);
    errors.into_result()
}

fn validate_cluster(cluster: &Cluster, errors: &mut ValidationErrors) {
    if cluster.node_count < 1 {
        errors.push(Violation::CannotBeLess {
            field: "Cluster.NodeCount".to_string(),
            min: 1,
        });
    }
    if !CLUSTER_NAME_PATTERN.is_match(&cluster.name) {
        errors.push(Violation::Custom(CLUSTER_NAME_MESSAGE.to_string()));
    }
    errors.require(!cluster.location.is_empty(), "Cluster.Location");
    errors.require(!cluster.machine_type.is_empty(), "Cluster.MachineType");
    errors.require(!cluster.kubernetes_version.is_empty(), "Cluster.KubernetesVersion");
    if cluster.disk_size_gb <= 0 {
        errors.push(Violation::CannotBeLess {
            field: "Cluster.DiskSizeGB".to_string(),
            min: 0,
        });
    }
}

fn validate_provider(provider: &Provider, errors: &mut ValidationErrors) {
    errors.require(
        !provider.credentials_file_path.as_str().is_empty(),
        "Provider.CredentialsFilePath",
    );
    errors.require(!provider.project_name.is_empty(), "Provider.ProjectName");
}

fn validate_custom_configurations(provider: &Provider, errors: &mut ValidationErrors) {
    let target = match provider.custom(keys::TARGET_PROVIDER) {
        Some(value) => {
            let parsed = value.parse::<TargetProvider>().ok();
            if parsed.is_none() {
                errors.push(Violation::Custom(format!(
                    "{} has to be one of: gcp, azure, aws",
                    custom_field(keys::TARGET_PROVIDER)
                )));
            }
            parsed
        }
        None => {
            errors.push(Violation::CannotBeEmpty(custom_field(keys::TARGET_PROVIDER)));
            None
        }
    };

    for key in keys::GARDENER_REQUIRED {
        errors.require(provider.custom(key).is_some(), &custom_field(key));
    }

    // Keys that only some target providers need. An unrecognized target
    // already produced a violation above and requires nothing further.
    if let Some(target) = target {
        for key in target.required_keys() {
            errors.require(provider.custom(key).is_some(), &custom_field(key));
        }
    }
}

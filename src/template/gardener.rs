//! Generated document for a Gardener shoot.
//!
//! The shoot's `cloud` block holds exactly one target-specific block
//! (`gcp`, `aws` or `azure`). That block carries the target's network
//! layout, one `worker` block per node named `cpu-worker-<index>`, and,
//! for every target except Azure, the availability zone list.

use tracing::debug;

use super::Document;
use crate::configuration::{ConfigMap, TargetProvider, keys};
use crate::error::HydroformError;

/// Plugin name the document configures.
pub const PROVIDER_NAME: &str = "gardener";

/// Variables every shoot document declares, regardless of target.
const COMMON_VARIABLES: &[&str] = &[
    keys::TARGET_PROVIDER,
    keys::TARGET_PROFILE,
    keys::TARGET_SEED,
    keys::TARGET_SECRET,
    keys::NODE_COUNT,
    keys::CLUSTER_NAME,
    keys::CREDENTIALS_FILE_PATH,
    keys::NAMESPACE,
    keys::LOCATION,
    keys::WORKER_CIDR,
    keys::MACHINE_TYPE,
    keys::KUBERNETES_VERSION,
    keys::DISK_SIZE,
    keys::DISK_TYPE,
    keys::AUTOSCALER_MIN,
    keys::AUTOSCALER_MAX,
    keys::MAX_SURGE,
    keys::MAX_UNAVAILABLE,
];

const HEADER: &str = r#"provider "gardener" {
  kube_file = file(var.credentials_file_path)
}

resource "gardener_shoot" "test_cluster" {
  metadata {
    name      = var.cluster_name
    namespace = var.namespace
  }

  spec {
    cloud {
      profile = var.target_profile
      region  = var.location
      seed    = var.target_seed
      secret_binding_ref {
        name = var.target_secret
      }

"#;

const FOOTER: &str = r#"    }

    kubernetes {
      version = var.kubernetes_version
    }
  }
}
"#;

/// Renders the shoot document for the configuration's target provider.
pub fn render(config: &ConfigMap) -> Result<Document, HydroformError> {
    let target = target_provider(config)?;
    let node_count = node_count(config)?;

    let mut variables = COMMON_VARIABLES.to_vec();
    variables.extend_from_slice(target.required_keys());

    let mut body = String::from(HEADER);
    body.push_str(&format!("      {} {{\n", target));
    body.push_str(network_block(target));
    for index in 0..node_count {
        body.push('\n');
        body.push_str(&worker_block(index));
    }
    if target.uses_zones() {
        body.push_str("\n        zones = [var.zone]\n");
    }
    body.push_str("      }\n");
    body.push_str(FOOTER);

    let document = Document::new(variables, &body);
    document.check_bindings(config)?;
    debug!(target = %target, workers = node_count, "rendered gardener shoot document");
    Ok(document)
}

fn target_provider(config: &ConfigMap) -> Result<TargetProvider, HydroformError> {
    let value = config.require(keys::TARGET_PROVIDER)?;
    value
        .as_str()
        .and_then(|name| name.parse().ok())
        .ok_or_else(|| {
            HydroformError::Render(format!(
                "target_provider '{}' has to be one of: gcp, azure, aws",
                value
            ))
        })
}

fn node_count(config: &ConfigMap) -> Result<u32, HydroformError> {
    let value = config.require(keys::NODE_COUNT)?;
    value
        .as_integer()
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| {
            HydroformError::Render(format!(
                "node_count '{}' is not a non-negative integer",
                value
            ))
        })
}

fn network_block(target: TargetProvider) -> &'static str {
    match target {
        TargetProvider::Gcp => {
            r#"        networks {
          workers = [var.workercidr]
        }
"#
        }
        TargetProvider::Azure => {
            r#"        networks {
          vnet    = [{ cidr = var.vnetcidr }]
          workers = var.workercidr
        }
"#
        }
        TargetProvider::Aws => {
            r#"        networks {
          workers  = [var.workercidr]
          public   = [var.publicscidr]
          internal = [var.internalscidr]
          vpc      = [{ cidr = var.vpccidr }]
        }
"#
        }
    }
}

fn worker_block(index: u32) -> String {
    format!(
        r#"        worker {{
          name            = "cpu-worker-{}"
          machine_type    = var.machine_type
          auto_scaler_min = var.autoscaler_min
          auto_scaler_max = var.autoscaler_max
          max_surge       = var.max_surge
          max_unavailable = var.max_unavailable
          volume_size     = "${{var.disk_size}}Gi"
          volume_type     = var.disk_type
        }}
"#,
        index
    )
}

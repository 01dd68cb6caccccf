//! Fixed document for a GKE cluster.

use super::Document;
use crate::configuration::keys;

/// Plugin name the document configures.
pub const PROVIDER_NAME: &str = "google";

const VARIABLES: &[&str] = &[
    keys::NODE_COUNT,
    keys::CLUSTER_NAME,
    keys::CREDENTIALS_FILE_PATH,
    keys::PROJECT,
    keys::LOCATION,
    keys::MACHINE_TYPE,
    keys::KUBERNETES_VERSION,
    keys::DISK_SIZE,
];

const BODY: &str = r#"provider "google" {
  credentials = file(var.credentials_file_path)
  project     = var.project
}

resource "google_container_cluster" "gke_cluster" {
  name               = var.cluster_name
  location           = var.location
  initial_node_count = var.node_count
  min_master_version = var.kubernetes_version
  node_version       = var.kubernetes_version

  node_config {
    machine_type = var.machine_type
    disk_size_gb = var.disk_size
  }

  maintenance_policy {
    daily_maintenance_window {
      start_time = "03:00"
    }
  }
}

output "endpoint" {
  value = google_container_cluster.gke_cluster.endpoint
}

output "cluster_ca_certificate" {
  value = google_container_cluster.gke_cluster.master_auth.0.cluster_ca_certificate
}
"#;

/// Returns the GKE cluster document.
pub fn document() -> Document {
    Document::new(VARIABLES.to_vec(), BODY)
}

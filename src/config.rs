//! YAML manifest loading and cluster record persistence.
//!
//! A manifest describes the desired cluster and where to create it:
//!
//! ```yaml
//! cluster:
//!   name: demo
//!   node_count: 3
//!   ...
//! provider:
//!   type: gardener
//!   credentials_file_path: gardener-kubeconfig.yaml
//!   ...
//! ```
//!
//! The record is the provisioned cluster, including the engine state a
//! later deprovision needs.

use std::fs::{self, File};
use std::io::BufReader;

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::HydroformError;
use crate::types::{Cluster, Provider};

/// Desired cluster plus the provider to create it with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub cluster: Cluster,
    pub provider: Provider,
}

/// Loads a manifest and resolves relative paths against its directory.
pub fn load_manifest(path: &Utf8Path) -> Result<Manifest> {
    let mut manifest: Manifest = read_yaml(path)?;
    let base_dir = path.parent().unwrap_or(Utf8Path::new("."));
    manifest.provider.resolve_paths(base_dir);
    debug!("loaded manifest {}", path);
    Ok(manifest)
}

/// Loads a cluster record written by [`save_record`].
pub fn load_record(path: &Utf8Path) -> Result<Cluster> {
    read_yaml(path)
}

/// Writes the cluster record, replacing any previous one.
pub fn save_record(path: &Utf8Path, cluster: &Cluster) -> Result<()> {
    let yaml = serde_yaml::to_string(cluster)
        .with_context(|| format!("failed to serialize cluster record for {}", cluster.name))?;
    fs::write(path, yaml)
        .map_err(|e| HydroformError::io(format!("failed to write cluster record {}", path), e))?;
    info!("cluster record written to {}", path);
    Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| HydroformError::io(format!("failed to load file: {}", path), e))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader)
        .map_err(|e| HydroformError::Config(format!("failed to parse yaml {}: {}", path, e)).into())
}

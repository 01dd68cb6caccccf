//! Domain-specific error types for hydroform.
//!
//! This module defines `HydroformError`, a `thiserror`-based enum with one
//! variant per failure stage of a provisioning call. Validation, rendering
//! and output decoding return it directly, while trait boundaries
//! (`Operator`, `Provisioner`, `CommandExecutor`) use `anyhow::Result` and
//! wrap it with a short stage phrase.
//!
//! The typed error survives that wrapping: callers recover it with
//! `anyhow::Error::downcast_ref::<HydroformError>()`, which is how the
//! partially applied engine state of a failed apply is retrieved.

use std::io;

use crate::types::ClusterInfo;
use crate::validation::ValidationErrors;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds instead of the
/// OS-level text (e.g., "No such file or directory (os error 2)").
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for hydroform.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HydroformError {
    /// One or more input rules were violated. Always raised before any side effect.
    #[error("input validation failed with the following information: {0}")]
    Validation(ValidationErrors),

    /// The selected provider or operator type has no working implementation.
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// A variable the rendered document declares has no binding.
    #[error("template render error: missing configuration key '{0}'")]
    MissingVariable(String),

    /// Template expansion failed for a reason other than a missing binding.
    #[error("template render error: {0}")]
    Render(String),

    /// The infrastructure engine failed to apply the document.
    ///
    /// `info` carries the state the engine left behind and an `Errored`
    /// status, so the caller can retry or clean up.
    #[error("engine apply failed: {source:#}")]
    Apply {
        info: Box<ClusterInfo>,
        #[source]
        source: anyhow::Error,
    },

    /// Apply succeeded but an expected output could not be decoded.
    #[error("unable to decode certificate data: {source}")]
    OutputDecode {
        info: Box<ClusterInfo>,
        #[source]
        source: base64::DecodeError,
    },

    /// A Kubernetes lookup (secret, pods, custom resource) failed.
    #[error("{context}: {message}")]
    ExternalLookup { context: String, message: String },

    /// Deprovision was requested for a cluster that carries no engine state.
    #[error("cluster '{0}' has no internal state to deprovision")]
    MissingState(String),

    /// A cluster record that still holds engine state would be replaced.
    #[error(
        "cluster record {0} still holds engine state; deprovision it first or choose another record path"
    )]
    RecordInUse(String),

    /// A command was not found in PATH.
    #[error("command not found in PATH: {command}")]
    CommandNotFound { command: String },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Exit code, signal, or a description of the internal failure.
        status: String,
    },

    /// A manifest or cluster record could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// A file path or an operation description with a path.
        context: String,
        /// Derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl HydroformError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Returns the cluster info attached to a failed apply or decode, if any.
    pub fn cluster_info(&self) -> Option<&ClusterInfo> {
        match self {
            Self::Apply { info, .. } | Self::OutputDecode { info, .. } => Some(info),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;
    use crate::types::{ClusterStatus, Phase};
    use crate::validation::Violation;

    fn errored_info() -> ClusterInfo {
        ClusterInfo {
            endpoint: String::new(),
            certificate_authority_data: Vec::new(),
            internal_state: EngineState::from_value(serde_json::json!({"serial": 3})),
            status: ClusterStatus::new(Phase::Errored),
        }
    }

    #[test]
    fn test_validation_display() {
        let err = HydroformError::Validation(ValidationErrors::from(vec![
            Violation::CannotBeEmpty("Cluster.Location".to_string()),
            Violation::CannotBeLess {
                field: "Cluster.NodeCount".to_string(),
                min: 1,
            },
        ]));
        assert_eq!(
            err.to_string(),
            "input validation failed with the following information: \
            Cluster.Location cannot be empty.; Cluster.NodeCount cannot be less than 1."
        );
    }

    #[test]
    fn test_execution_display() {
        let err = HydroformError::Execution {
            command: "terraform".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "command execution failed: terraform: exit status: 1");
    }

    #[test]
    fn test_missing_variable_display() {
        let err = HydroformError::MissingVariable("workercidr".to_string());
        assert_eq!(err.to_string(), "template render error: missing configuration key 'workercidr'");
    }

    #[test]
    fn test_cluster_info_attached_to_apply_error() {
        let err = HydroformError::Apply {
            info: Box::new(errored_info()),
            source: anyhow::anyhow!("quota exceeded"),
        };
        let info = err.cluster_info().expect("apply error should carry cluster info");
        assert_eq!(info.status.phase, Phase::Errored);
        assert!(!info.internal_state.is_empty());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_record_in_use_display() {
        let err = HydroformError::RecordInUse("cluster-record.yaml".to_string());
        assert!(err.to_string().starts_with("cluster record cluster-record.yaml still holds engine state"));
    }

    #[test]
    fn test_cluster_info_absent_on_other_variants() {
        let err = HydroformError::UnsupportedBackend("aws not supported yet".to_string());
        assert!(err.cluster_info().is_none());
    }

    #[test]
    fn test_io_display() {
        let source = io::Error::new(io::ErrorKind::NotFound, "entity not found");
        let err = HydroformError::io("/path/to/cluster.yaml", source);
        assert_eq!(err.to_string(), "/path/to/cluster.yaml: I/O error: not found");
    }

    #[test]
    fn test_io_error_kind_message_other() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let msg = io_error_kind_message(&err);
        assert!(msg.starts_with("I/O error: "));
    }

    #[test]
    fn test_into_anyhow_error_keeps_type() {
        let err = HydroformError::UnsupportedBackend("unknown provider".to_string());
        let anyhow_err = anyhow::Error::from(err).context("unable to provision cluster");
        let downcast = anyhow_err.downcast_ref::<HydroformError>();
        assert!(matches!(downcast, Some(HydroformError::UnsupportedBackend(_))));
    }
}

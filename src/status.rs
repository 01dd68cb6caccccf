//! Translation of Gardener's native last-operation state into [`Phase`].

use strum::EnumString;

use crate::types::{ClusterStatus, Phase};

/// State reported by a shoot in `.status.lastOperation.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum LastOperationState {
    Processing,
    Pending,
    Succeeded,
    Error,
    Failed,
    Aborted,
}

impl LastOperationState {
    pub fn phase(self) -> Phase {
        match self {
            Self::Processing => Phase::Provisioning,
            Self::Pending => Phase::Pending,
            Self::Succeeded => Phase::Provisioned,
            Self::Error | Self::Failed | Self::Aborted => Phase::Errored,
        }
    }
}

/// Maps a native state to a phase. Unrecognized or absent states are `Unknown`.
pub fn phase_for(native: Option<&str>) -> Phase {
    native
        .and_then(|state| state.parse::<LastOperationState>().ok())
        .map_or(Phase::Unknown, LastOperationState::phase)
}

pub fn cluster_status(native: Option<&str>) -> ClusterStatus {
    ClusterStatus::new(phase_for(native))
}

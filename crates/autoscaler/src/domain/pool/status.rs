use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::types::AgentPoolSnapshot;
use super::types::ScaleDecision;

/// Phase of the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "camelCase")]
pub enum ReconcilerState {
    #[default]
    #[display("idle")]
    Idle,
    #[display("inspecting")]
    Inspecting,
    #[display("estimating")]
    Estimating,
    #[display("applying")]
    Applying,
    #[display("stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub busy: i32,
    pub idle: i32,
    pub unknown: i32,
    pub current_replicas: i32,
    pub desired_replicas: i32,
}

impl From<&AgentPoolSnapshot> for SnapshotSummary {
    fn from(snapshot: &AgentPoolSnapshot) -> Self {
        Self {
            busy: snapshot.busy_count(),
            idle: snapshot.idle_count(),
            unknown: snapshot.unknown_count(),
            current_replicas: snapshot.current_replicas,
            desired_replicas: snapshot.desired_replicas,
        }
    }
}

/// What the control loop last saw and did, served on `/status`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalerStatus {
    pub resource: String,
    pub state: ReconcilerState,
    pub last_snapshot: Option<SnapshotSummary>,
    pub last_decision: Option<ScaleDecision>,
    pub last_error: Option<String>,
    pub consecutive_unavailable: u32,
    pub updated_at: Option<DateTime<Utc>>,
    pub scale_ups: u64,
    pub scale_downs: u64,
    pub limited_decisions: u64,
}

impl ScalerStatus {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }
}

pub type SharedStatus = Arc<RwLock<ScalerStatus>>;

/// Apply `update` to the shared status and stamp it.
///
/// A poisoned lock only means a writer panicked mid-update; the record is
/// still served.
pub(crate) fn update_status(status: &SharedStatus, update: impl FnOnce(&mut ScalerStatus)) {
    let mut guard = status.write().unwrap_or_else(PoisonError::into_inner);
    update(&mut guard);
    guard.updated_at = Some(Utc::now());
}

/// Copy of the current status.
pub fn read_status(status: &SharedStatus) -> ScalerStatus {
    status.read().unwrap_or_else(PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn update_stamps_status() {
        let status: SharedStatus = Arc::new(RwLock::new(ScalerStatus::new("statefulset/azp-agent")));
        update_status(&status, |s| {
            s.state = ReconcilerState::Applying;
            s.scale_ups += 1;
        });

        let current = read_status(&status);
        assert_eq!(current.state, ReconcilerState::Applying);
        assert_eq!(current.scale_ups, 1);
        assert!(current.updated_at.is_some());
    }

    #[test]
    fn serializes_camel_case() {
        let status = ScalerStatus::new("statefulset/azp-agent");
        let json = serde_json::to_value(&status).expect("status serializes");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["consecutiveUnavailable"], 0);
        assert_eq!(json["resource"], "statefulset/azp-agent");
    }
}

use std::time::Duration;

use tokio::time::Instant;

use super::types::AgentPoolSnapshot;
use super::types::Limit;
use super::types::ScaleDecision;
use super::types::ScaleReason;
use crate::config::ScalerConfig;

/// Guard rails applied to an estimated decision before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingLimits {
    min_replicas: i32,
    max_replicas: i32,
    scale_down_max: Option<i32>,
    scale_down_delay: Duration,
}

impl ScalingLimits {
    pub fn from_config(config: &ScalerConfig) -> Self {
        Self {
            min_replicas: config.min_free_agents,
            max_replicas: config.max_replicas.max(config.min_free_agents),
            scale_down_max: config.scale_down_max,
            scale_down_delay: config.scale_down_delay,
        }
    }

    /// Constrain `decision`, in order: max replicas, busy ordinal,
    /// scale-down step, scale-down delay.
    ///
    /// A StatefulSet removes its highest ordinals first, so a scale down never
    /// goes below the highest busy ordinal plus one. The reason names the last
    /// limit that changed the target, even when that leaves the pool at its
    /// current size.
    pub fn constrain(
        &self,
        decision: ScaleDecision,
        snapshot: &AgentPoolSnapshot,
        last_scale_down: Option<Instant>,
        now: Instant,
    ) -> ScaleDecision {
        let current = decision.current_replicas;
        let mut target = decision.target_replicas;
        let mut reason = decision.reason;

        let clamped = target.min(self.max_replicas).max(self.min_replicas);
        if clamped != target {
            target = clamped;
            reason = ScaleReason::Limited(Limit::MaxReplicas);
        }

        if target < current {
            if let Some(ordinal) = snapshot.highest_busy_ordinal() {
                let floor = (ordinal as i32).saturating_add(1).min(current);
                if target < floor {
                    target = floor;
                    reason = ScaleReason::Limited(Limit::BusyOrdinal);
                }
            }
        }

        if target < current {
            if let Some(step) = self.scale_down_max {
                if current - target > step {
                    target = current - step;
                    reason = ScaleReason::Limited(Limit::ScaleDownStep);
                }
            }
        }

        if target < current && !self.scale_down_delay.is_zero() {
            let too_soon = last_scale_down
                .is_some_and(|last| now.saturating_duration_since(last) < self.scale_down_delay);
            if too_soon {
                target = current;
                reason = ScaleReason::Limited(Limit::ScaleDownDelay);
            }
        }

        if target == current && !matches!(reason, ScaleReason::Limited(_)) {
            reason = ScaleReason::Stable;
        }

        ScaleDecision {
            target_replicas: target,
            current_replicas: current,
            reason,
        }
    }
}

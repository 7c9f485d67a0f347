use std::cmp::Ordering;

use super::types::AgentPoolSnapshot;
use super::types::ScaleDecision;
use super::types::ScaleReason;
use crate::config::ScalerConfig;

/// Compute the replica count that keeps every busy agent plus the free-agent floor.
///
/// `target = busy + max(min_free_agents, 1)`. Idle and unknown pods do not
/// raise the target; unknown pods are never counted as free capacity.
pub fn estimate(snapshot: &AgentPoolSnapshot, config: &ScalerConfig) -> ScaleDecision {
    let target_replicas = snapshot
        .busy_count()
        .saturating_add(config.min_free_agents.max(1));
    let reason = match target_replicas.cmp(&snapshot.current_replicas) {
        Ordering::Equal => ScaleReason::Stable,
        Ordering::Greater => ScaleReason::ScaleUp,
        Ordering::Less => ScaleReason::ScaleDown,
    };

    ScaleDecision {
        target_replicas,
        current_replicas: snapshot.current_replicas,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use similar_asserts::assert_eq;

    use super::*;
    use crate::config::ResourceRef;
    use crate::domain::pool::AgentPhase;
    use crate::domain::pool::AgentStatus;

    fn config(min_free_agents: i32) -> ScalerConfig {
        ScalerConfig::new(
            ResourceRef::stateful_set("azp", "azp-agent"),
            min_free_agents,
            Duration::from_secs(10),
        )
    }

    fn snapshot(busy: usize, idle: usize, unknown: usize, current_replicas: i32) -> AgentPoolSnapshot {
        let phases = std::iter::repeat(AgentPhase::Busy)
            .take(busy)
            .chain(std::iter::repeat(AgentPhase::Idle).take(idle))
            .chain(std::iter::repeat(AgentPhase::Unknown).take(unknown));
        let agents = phases
            .enumerate()
            .map(|(i, phase)| AgentStatus {
                pod_name: format!("azp-agent-{i}"),
                phase,
                ordinal: Some(i as u32),
            })
            .collect();
        AgentPoolSnapshot::new(agents, current_replicas, current_replicas)
    }

    #[test]
    fn keeps_busy_agents_plus_free_floor() {
        let decision = estimate(&snapshot(3, 1, 0, 4), &config(2));
        assert_eq!(decision.target_replicas, 5);
        assert_eq!(decision.reason, ScaleReason::ScaleUp);
    }

    #[test]
    fn scales_down_surplus_idle_agents() {
        let decision = estimate(&snapshot(0, 2, 0, 2), &config(1));
        assert_eq!(decision.target_replicas, 1);
        assert_eq!(decision.reason, ScaleReason::ScaleDown);
    }

    #[test]
    fn equal_target_is_stable() {
        let decision = estimate(&snapshot(2, 1, 0, 3), &config(1));
        assert_eq!(decision.target_replicas, 3);
        assert_eq!(decision.reason, ScaleReason::Stable);
        assert!(decision.is_stable());
    }

    #[test]
    fn unknown_pods_are_not_free_capacity() {
        // Two starting pods do not satisfy the floor of one free agent.
        let decision = estimate(&snapshot(1, 0, 2, 3), &config(1));
        assert_eq!(decision.target_replicas, 2);
    }

    #[test]
    fn target_saturates_at_largest_replica_count() {
        let decision = estimate(&snapshot(1, 0, 0, 1), &config(i32::MAX));
        assert_eq!(decision.target_replicas, i32::MAX);
        assert_eq!(decision.reason, ScaleReason::ScaleUp);
    }

    #[test]
    fn target_follows_formula_and_respects_floor() {
        for min_free in 1..=5 {
            for busy in 0..=8 {
                for idle in 0..=4 {
                    for unknown in 0..=2 {
                        let current = (busy + idle + unknown) as i32;
                        let config = config(min_free);
                        let snapshot = snapshot(busy, idle, unknown, current);
                        let decision = estimate(&snapshot, &config);

                        assert!(decision.target_replicas >= config.min_free_agents);
                        assert_eq!(decision.target_replicas, busy as i32 + min_free.max(1));
                        assert_eq!(decision, estimate(&snapshot, &config), "estimate must be pure");
                    }
                }
            }
        }
    }
}

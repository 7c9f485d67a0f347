use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;

use crate::config::ResourceRef;
use crate::domain::pool::AgentPoolSnapshot;
use crate::domain::pool::ScaleDecision;

pub mod encoders;
use encoders::create_encoder;
use encoders::FieldValue;
use encoders::MetricsEncoder;
pub use encoders::MetricsFormat;

pub const POOL_MEASUREMENT: &str = "azp_agent_pool";

// Wrapper struct for Vec<u8> that implements Display
pub struct BytesWrapper(Vec<u8>);

impl fmt::Display for BytesWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => {
                tracing::error!(msg = "Failed to convert metrics line to string");
                Err(fmt::Error)
            }
        }
    }
}

impl From<Vec<u8>> for BytesWrapper {
    fn from(bytes: Vec<u8>) -> Self {
        BytesWrapper(bytes)
    }
}

/// Writes one pool line per reconcile pass to the `metrics` target.
pub struct PoolMetrics {
    encoder: Box<dyn MetricsEncoder>,
    tags: BTreeMap<String, String>,
}

impl PoolMetrics {
    pub fn new(format: MetricsFormat, resource: &ResourceRef) -> Self {
        let tags = BTreeMap::from([
            ("kind".to_string(), resource.kind.to_string()),
            ("name".to_string(), resource.name.clone()),
            ("namespace".to_string(), resource.namespace.clone()),
        ]);
        Self {
            encoder: create_encoder(format),
            tags,
        }
    }

    pub fn encode(&self, snapshot: &AgentPoolSnapshot, decision: &ScaleDecision, timestamp: i64) -> String {
        let fields = BTreeMap::from([
            ("total".to_string(), FieldValue::from(snapshot.agents.len() as i64)),
            ("busy".to_string(), snapshot.busy_count().into()),
            ("idle".to_string(), snapshot.idle_count().into()),
            ("unknown".to_string(), snapshot.unknown_count().into()),
            ("current_replicas".to_string(), snapshot.current_replicas.into()),
            ("desired_replicas".to_string(), snapshot.desired_replicas.into()),
            ("target_replicas".to_string(), decision.target_replicas.into()),
            ("scale_size".to_string(), decision.scale_size().into()),
            ("reason".to_string(), decision.reason.to_string().into()),
        ]);
        self.encoder
            .encode_metrics(POOL_MEASUREMENT, &self.tags, &fields, timestamp)
    }

    pub fn record(&self, snapshot: &AgentPoolSnapshot, decision: &ScaleDecision) {
        let line = self.encode(snapshot, decision, current_time());
        tracing::info!(target: "metrics", msg = %line.trim_end());
    }
}

/// Nanoseconds since the Unix epoch.
pub fn current_time() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::domain::pool::AgentPhase;
    use crate::domain::pool::AgentStatus;
    use crate::domain::pool::ScaleReason;

    fn sample() -> (AgentPoolSnapshot, ScaleDecision) {
        let agents = [AgentPhase::Busy, AgentPhase::Busy, AgentPhase::Idle, AgentPhase::Unknown]
            .into_iter()
            .enumerate()
            .map(|(i, phase)| AgentStatus {
                pod_name: format!("azp-agent-{i}"),
                phase,
                ordinal: Some(i as u32),
            })
            .collect();
        let snapshot = AgentPoolSnapshot::new(agents, 4, 4);
        let decision = ScaleDecision {
            target_replicas: 3,
            current_replicas: 4,
            reason: ScaleReason::ScaleDown,
        };
        (snapshot, decision)
    }

    #[test]
    fn influx_line_carries_pool_counts() {
        let (snapshot, decision) = sample();
        let metrics = PoolMetrics::new(MetricsFormat::Influx, &ResourceRef::stateful_set("azp", "azp-agent"));

        let line = metrics.encode(&snapshot, &decision, 1000);

        assert!(line.starts_with("azp_agent_pool,kind=StatefulSet,name=azp-agent,namespace=azp "));
        assert!(line.contains("busy=2i"));
        assert!(line.contains("idle=1i"));
        assert!(line.contains("unknown=1i"));
        assert!(line.contains("scale_size=-1i"));
        assert!(line.contains("reason=\"scale down\""));
        assert!(line.trim_end().ends_with(" 1000"));
    }

    #[test]
    fn json_line_carries_pool_counts() {
        let (snapshot, decision) = sample();
        let metrics = PoolMetrics::new(MetricsFormat::Json, &ResourceRef::stateful_set("azp", "azp-agent"));

        let parsed: Value = serde_json::from_str(&metrics.encode(&snapshot, &decision, 1000)).unwrap();

        assert_eq!(parsed["measure"], POOL_MEASUREMENT);
        assert_eq!(parsed["tag"]["namespace"], "azp");
        assert_eq!(parsed["field"]["total"], 4);
        assert_eq!(parsed["field"]["target_replicas"], 3);
    }
}

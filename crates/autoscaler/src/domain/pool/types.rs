use serde::Serialize;

/// Readiness of an agent pod to accept new work at inspection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
pub enum AgentPhase {
    /// Running, ready and not assigned a job.
    #[display("idle")]
    Idle,
    /// Running an assigned pipeline job.
    #[display("busy")]
    Busy,
    /// Starting, terminating or otherwise not ready. Never counted as free.
    #[display("unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub pod_name: String,
    pub phase: AgentPhase,
    /// StatefulSet ordinal parsed from the pod name.
    pub ordinal: Option<u32>,
}

/// Point-in-time view of the managed pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolSnapshot {
    /// Agents ordered by ordinal, pods without one last.
    pub agents: Vec<AgentStatus>,
    /// Replicas requested in the resource spec.
    pub desired_replicas: i32,
    /// Replicas reported by the API server, including starting pods.
    pub current_replicas: i32,
}

impl AgentPoolSnapshot {
    pub fn new(mut agents: Vec<AgentStatus>, desired_replicas: i32, current_replicas: i32) -> Self {
        agents.sort_by(|a, b| match (a.ordinal, b.ordinal) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.pod_name.cmp(&b.pod_name),
        });
        Self {
            agents,
            desired_replicas,
            current_replicas,
        }
    }

    pub fn count(&self, phase: AgentPhase) -> i32 {
        self.agents.iter().filter(|a| a.phase == phase).count() as i32
    }

    pub fn busy_count(&self) -> i32 {
        self.count(AgentPhase::Busy)
    }

    pub fn idle_count(&self) -> i32 {
        self.count(AgentPhase::Idle)
    }

    pub fn unknown_count(&self) -> i32 {
        self.count(AgentPhase::Unknown)
    }

    /// Highest ordinal among busy agents.
    pub fn highest_busy_ordinal(&self) -> Option<u32> {
        self.agents
            .iter()
            .filter(|a| a.phase == AgentPhase::Busy)
            .filter_map(|a| a.ordinal)
            .max()
    }
}

/// Guard rail that changed an estimated target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum Limit {
    #[display("max replicas")]
    MaxReplicas,
    #[display("busy agent ordinal")]
    BusyOrdinal,
    #[display("scale-down step")]
    ScaleDownStep,
    #[display("scale-down delay")]
    ScaleDownDelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum ScaleReason {
    #[display("stable")]
    Stable,
    #[display("scale up")]
    ScaleUp,
    #[display("scale down")]
    ScaleDown,
    #[display("limited by {_0}")]
    Limited(Limit),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleDecision {
    pub target_replicas: i32,
    /// Replica count the decision was computed against.
    pub current_replicas: i32,
    pub reason: ScaleReason,
}

impl ScaleDecision {
    pub fn is_stable(&self) -> bool {
        self.target_replicas == self.current_replicas
    }

    pub fn is_scale_down(&self) -> bool {
        self.target_replicas < self.current_replicas
    }

    /// Signed replica delta, positive when scaling up.
    pub fn scale_size(&self) -> i32 {
        self.target_replicas - self.current_replicas
    }
}

use std::sync::Arc;

use error_stack::Report;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::call::bounded;
use super::traits::ClusterApi;
use super::traits::ClusterError;
use super::types::AgentPoolSnapshot;
use super::types::AgentStatus;
use crate::config::ScalerConfig;
use crate::infrastructure::k8s::classify_pod;
use crate::infrastructure::k8s::pod_ordinal;

/// Reads the managed pool and classifies its members.
pub struct AgentPoolInspector<C: ClusterApi + ?Sized> {
    cluster: Arc<C>,
    config: Arc<ScalerConfig>,
}

impl<C: ClusterApi + ?Sized> AgentPoolInspector<C> {
    pub fn new(cluster: Arc<C>, config: Arc<ScalerConfig>) -> Self {
        Self { cluster, config }
    }

    /// Take a fresh snapshot of the pool.
    ///
    /// Each cluster call is bounded by the configured call timeout.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::ResourceUnavailable`] if the StatefulSet does not exist
    /// - [`ClusterError::Transient`] for failed or timed out calls
    /// - [`ClusterError::Cancelled`] if shutdown was requested mid-call
    pub async fn inspect(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Result<AgentPoolSnapshot, Report<ClusterError>> {
        let target = &self.config.resource;
        let timeout = self.config.call_timeout;

        let state = bounded(
            "get resource",
            timeout,
            cancellation_token,
            self.cluster.get_resource(target),
        )
        .await?;

        if state.selector.is_empty() {
            return Err(Report::new(ClusterError::ResourceUnavailable {
                resource: target.to_string(),
            })
            .attach_printable("resource has an empty pod selector"));
        }

        let pods = bounded(
            "list pods",
            timeout,
            cancellation_token,
            self.cluster.list_pods(&target.namespace, &state.selector),
        )
        .await?;

        let agents = pods
            .iter()
            .map(|pod| {
                let pod_name = pod.metadata.name.clone().unwrap_or_default();
                AgentStatus {
                    ordinal: pod_ordinal(&pod_name, &target.name),
                    phase: classify_pod(pod, &self.config.busy_marker),
                    pod_name,
                }
            })
            .collect();

        let snapshot = AgentPoolSnapshot::new(agents, state.desired_replicas, state.current_replicas);
        debug!(
            "{} pods ({} busy, {} idle, {} unknown), {} current and {} desired replicas",
            snapshot.agents.len(),
            snapshot.busy_count(),
            snapshot.idle_count(),
            snapshot.unknown_count(),
            snapshot.current_replicas,
            snapshot.desired_replicas,
        );
        Ok(snapshot)
    }
}

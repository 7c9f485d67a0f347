use core::error::Error;
use std::sync::Arc;

use error_stack::Report;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::call::bounded;
use super::estimator::estimate;
use super::inspector::AgentPoolInspector;
use super::limits::ScalingLimits;
use super::status::update_status;
use super::status::ReconcilerState;
use super::status::SharedStatus;
use super::status::SnapshotSummary;
use super::traits::ClusterApi;
use super::traits::ClusterError;
use super::types::AgentPoolSnapshot;
use super::types::ScaleDecision;
use crate::config::ScalerConfig;
use crate::infrastructure::metrics::PoolMetrics;

/// Result of a single reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Target already matches the current replica count, nothing was written.
    Stable { replicas: i32 },
    /// The replica count was updated.
    Scaled { from: i32, to: i32 },
    /// The resource spec already asks for the target, pods are still converging.
    InProgress { target: i32 },
    /// A recoverable error ended the pass early.
    Skipped { kind: &'static str },
    /// The update conflicted twice and is left to the next pass.
    Deferred { target: i32 },
    Cancelled,
}

/// Errors that stop the control loop.
#[derive(Debug, derive_more::Display)]
pub enum ReconcileError {
    #[display("{resource} was unavailable for {attempts} consecutive polls")]
    UnavailableBudgetExhausted { resource: String, attempts: u32 },
}

impl Error for ReconcileError {}

/// A snapshot with its estimated and constrained decisions.
struct Plan {
    snapshot: AgentPoolSnapshot,
    estimated: ScaleDecision,
    decision: ScaleDecision,
}

impl Plan {
    fn is_limited(&self) -> bool {
        self.decision.target_replicas != self.estimated.target_replicas
    }
}

/// Periodic inspect, estimate, constrain and apply loop for one agent pool.
pub struct Reconciler<C: ClusterApi + ?Sized> {
    config: Arc<ScalerConfig>,
    cluster: Arc<C>,
    inspector: AgentPoolInspector<C>,
    limits: ScalingLimits,
    status: SharedStatus,
    metrics: Option<PoolMetrics>,
    consecutive_unavailable: u32,
    last_scale_down: Option<Instant>,
}

impl<C: ClusterApi + ?Sized> Reconciler<C> {
    pub fn new(
        config: Arc<ScalerConfig>,
        cluster: Arc<C>,
        status: SharedStatus,
        metrics: Option<PoolMetrics>,
    ) -> Self {
        Self {
            inspector: AgentPoolInspector::new(cluster.clone(), config.clone()),
            limits: ScalingLimits::from_config(&config),
            config,
            cluster,
            status,
            metrics,
            consecutive_unavailable: 0,
            last_scale_down: None,
        }
    }

    /// Run ticks every poll interval until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnavailableBudgetExhausted`] once the managed
    /// resource was missing for `unavailable_budget` consecutive ticks.
    #[tracing::instrument(
        skip_all,
        fields(namespace = %self.config.resource.namespace, name = %self.config.resource.name)
    )]
    pub async fn run(mut self, cancellation_token: CancellationToken) -> Result<(), Report<ReconcileError>> {
        info!(
            "Autoscaling {} every {:?} with {} free agent(s)",
            self.config.resource, self.config.poll_interval, self.config.min_free_agents
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.tick(&cancellation_token).await {
                Ok(TickOutcome::Cancelled) => break,
                Ok(outcome) => debug!(?outcome, "Tick finished"),
                Err(report) => {
                    error!("Stopping autoscaler: {report:?}");
                    self.set_state(ReconcilerState::Stopped);
                    return Err(report);
                }
            }
        }

        self.set_state(ReconcilerState::Stopped);
        info!("Autoscaler stopped");
        Ok(())
    }

    /// One pass of inspect, estimate, constrain and apply.
    pub async fn tick(&mut self, cancellation_token: &CancellationToken) -> Result<TickOutcome, Report<ReconcileError>> {
        if cancellation_token.is_cancelled() {
            self.set_state(ReconcilerState::Stopped);
            return Ok(TickOutcome::Cancelled);
        }

        self.set_state(ReconcilerState::Inspecting);
        let snapshot = match self.inspector.inspect(cancellation_token).await {
            Ok(snapshot) => snapshot,
            Err(report) => return self.recover(report),
        };
        self.inspected();

        self.set_state(ReconcilerState::Estimating);
        let mut plan = self.plan(snapshot);

        let outcome = match Self::settled(&plan.snapshot, &plan.decision) {
            Some(outcome) => Ok(outcome),
            None => {
                self.set_state(ReconcilerState::Applying);
                self.apply(&mut plan, cancellation_token).await
            }
        };
        self.record(&plan);
        let outcome = outcome?;

        if outcome != TickOutcome::Cancelled {
            self.set_state(ReconcilerState::Idle);
        }
        Ok(outcome)
    }

    /// Outcome of a decision that needs no write.
    fn settled(snapshot: &AgentPoolSnapshot, decision: &ScaleDecision) -> Option<TickOutcome> {
        if decision.is_stable() {
            return Some(TickOutcome::Stable {
                replicas: decision.current_replicas,
            });
        }
        if decision.target_replicas == snapshot.desired_replicas {
            debug!(
                "Scale to {} replicas already requested, {} pods reported",
                decision.target_replicas, decision.current_replicas
            );
            return Some(TickOutcome::InProgress {
                target: decision.target_replicas,
            });
        }
        None
    }

    /// Estimate and constrain a decision for `snapshot`.
    fn plan(&self, snapshot: AgentPoolSnapshot) -> Plan {
        let estimated = estimate(&snapshot, &self.config);
        let decision = self
            .limits
            .constrain(estimated.clone(), &snapshot, self.last_scale_down, Instant::now());
        Plan {
            snapshot,
            estimated,
            decision,
        }
    }

    /// Publish the decision a tick settled on. Called once per tick.
    fn record(&self, plan: &Plan) {
        let limited = plan.is_limited();
        if limited {
            debug!(
                "Estimated {} replicas, constrained to {} ({})",
                plan.estimated.target_replicas, plan.decision.target_replicas, plan.decision.reason
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record(&plan.snapshot, &plan.decision);
        }

        let summary = SnapshotSummary::from(&plan.snapshot);
        let recorded = plan.decision.clone();
        update_status(&self.status, |status| {
            status.last_snapshot = Some(summary);
            status.last_decision = Some(recorded);
            if limited {
                status.limited_decisions += 1;
            }
        });
    }

    /// Write the planned decision, retrying once with a fresh plan on conflict.
    async fn apply(
        &mut self,
        plan: &mut Plan,
        cancellation_token: &CancellationToken,
    ) -> Result<TickOutcome, Report<ReconcileError>> {
        let mut retried = false;
        loop {
            let target = plan.decision.target_replicas;
            let result = bounded(
                "update replicas",
                self.config.call_timeout,
                cancellation_token,
                self.cluster.update_replicas(&self.config.resource, target),
            )
            .await;

            let report = match result {
                Ok(()) => return Ok(self.scaled(&plan.decision)),
                Err(report) => report,
            };

            if !matches!(report.current_context(), ClusterError::Conflict { .. }) {
                return self.recover(report);
            }
            if retried {
                warn!(
                    "Scale of {} to {target} replicas conflicted again, deferring to the next poll",
                    self.config.resource
                );
                return Ok(TickOutcome::Deferred { target });
            }
            retried = true;

            warn!("{}, reading it again", report.current_context());
            let snapshot = match self.inspector.inspect(cancellation_token).await {
                Ok(snapshot) => snapshot,
                Err(report) => return self.recover(report),
            };
            self.inspected();
            *plan = self.plan(snapshot);
            if let Some(outcome) = Self::settled(&plan.snapshot, &plan.decision) {
                return Ok(outcome);
            }
        }
    }

    fn scaled(&mut self, decision: &ScaleDecision) -> TickOutcome {
        info!(
            "Scaled {} from {} to {} replicas ({})",
            self.config.resource.friendly_name(),
            decision.current_replicas,
            decision.target_replicas,
            decision.reason
        );

        let scale_down = decision.is_scale_down();
        if scale_down {
            self.last_scale_down = Some(Instant::now());
        }
        update_status(&self.status, |status| {
            if scale_down {
                status.scale_downs += 1;
            } else {
                status.scale_ups += 1;
            }
            status.last_error = None;
        });

        TickOutcome::Scaled {
            from: decision.current_replicas,
            to: decision.target_replicas,
        }
    }

    fn inspected(&mut self) {
        self.consecutive_unavailable = 0;
        update_status(&self.status, |status| status.consecutive_unavailable = 0);
    }

    /// Turn a cluster error into a skipped tick, or a fatal error once the
    /// unavailable budget is spent.
    fn recover(&mut self, report: Report<ClusterError>) -> Result<TickOutcome, Report<ReconcileError>> {
        let error = report.current_context().clone();
        let kind = error.kind();
        let resource = &self.config.resource;

        match error {
            ClusterError::Cancelled => {
                self.set_state(ReconcilerState::Stopped);
                return Ok(TickOutcome::Cancelled);
            }
            ClusterError::ResourceUnavailable { .. } => {
                self.consecutive_unavailable += 1;
                let attempts = self.consecutive_unavailable;
                update_status(&self.status, |status| {
                    status.consecutive_unavailable = attempts;
                    status.last_error = Some(error.to_string());
                });

                if attempts >= self.config.unavailable_budget {
                    error!(
                        namespace = %resource.namespace,
                        name = %resource.name,
                        kind,
                        attempts,
                        "Giving up: {error}"
                    );
                    return Err(report.change_context(ReconcileError::UnavailableBudgetExhausted {
                        resource: resource.to_string(),
                        attempts,
                    }));
                }
                warn!(
                    namespace = %resource.namespace,
                    name = %resource.name,
                    kind,
                    attempts,
                    "Skipping poll: {error}"
                );
            }
            ClusterError::Transient { .. } | ClusterError::Conflict { .. } => {
                update_status(&self.status, |status| status.last_error = Some(error.to_string()));
                warn!(
                    namespace = %resource.namespace,
                    name = %resource.name,
                    kind,
                    "Skipping poll: {error}"
                );
            }
        }

        self.set_state(ReconcilerState::Idle);
        Ok(TickOutcome::Skipped { kind })
    }

    fn set_state(&self, state: ReconcilerState) {
        update_status(&self.status, |status| status.state = state);
    }
}

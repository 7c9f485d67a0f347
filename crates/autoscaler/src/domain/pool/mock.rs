//! In-memory [`ClusterApi`] used by the control loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use error_stack::Report;
use k8s_openapi::api::core::v1::Pod;

use super::traits::ClusterApi;
use super::traits::ClusterError;
use super::traits::ResourceState;
use crate::config::ResourceRef;

#[derive(Debug)]
struct FakeState {
    desired_replicas: i32,
    current_replicas: i32,
    selector: String,
    pods: Vec<Pod>,
    missing: bool,
    has_autoscaler: bool,
    inspect_failures: VecDeque<ClusterError>,
    update_failures: VecDeque<ClusterError>,
    update_delay: Option<Duration>,
    update_attempts: usize,
    successful_updates: Vec<i32>,
}

#[derive(Debug)]
pub(crate) struct FakeClusterApi {
    state: Mutex<FakeState>,
}

impl FakeClusterApi {
    pub(crate) fn new(replicas: i32) -> Self {
        Self {
            state: Mutex::new(FakeState {
                desired_replicas: replicas,
                current_replicas: replicas,
                selector: "app=azp-agent".to_string(),
                pods: Vec::new(),
                missing: false,
                has_autoscaler: false,
                inspect_failures: VecDeque::new(),
                update_failures: VecDeque::new(),
                update_delay: None,
                update_attempts: 0,
                successful_updates: Vec::new(),
            }),
        }
    }

    pub(crate) fn with_pods(self, pods: Vec<Pod>) -> Self {
        self.state.lock().unwrap().pods = pods;
        self
    }

    pub(crate) fn with_replicas(self, desired_replicas: i32, current_replicas: i32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.desired_replicas = desired_replicas;
            state.current_replicas = current_replicas;
        }
        self
    }

    pub(crate) fn with_selector(self, selector: &str) -> Self {
        self.state.lock().unwrap().selector = selector.to_string();
        self
    }

    pub(crate) fn set_missing(&self, missing: bool) {
        self.state.lock().unwrap().missing = missing;
    }

    pub(crate) fn set_autoscaler(&self, has_autoscaler: bool) {
        self.state.lock().unwrap().has_autoscaler = has_autoscaler;
    }

    pub(crate) fn set_update_delay(&self, delay: Duration) {
        self.state.lock().unwrap().update_delay = Some(delay);
    }

    /// Fail the next `get_resource` call with `error`.
    pub(crate) fn fail_next_inspect(&self, error: ClusterError) {
        self.state.lock().unwrap().inspect_failures.push_back(error);
    }

    /// Fail the next `update_replicas` call with `error`.
    pub(crate) fn fail_next_update(&self, error: ClusterError) {
        self.state.lock().unwrap().update_failures.push_back(error);
    }

    pub(crate) fn update_attempts(&self) -> usize {
        self.state.lock().unwrap().update_attempts
    }

    pub(crate) fn successful_updates(&self) -> Vec<i32> {
        self.state.lock().unwrap().successful_updates.clone()
    }

    pub(crate) fn replicas(&self) -> i32 {
        self.state.lock().unwrap().desired_replicas
    }
}

#[async_trait::async_trait]
impl ClusterApi for FakeClusterApi {
    async fn get_resource(&self, target: &ResourceRef) -> Result<ResourceState, Report<ClusterError>> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.inspect_failures.pop_front() {
            return Err(Report::new(error));
        }
        if state.missing {
            return Err(Report::new(ClusterError::ResourceUnavailable {
                resource: target.to_string(),
            }));
        }
        Ok(ResourceState {
            desired_replicas: state.desired_replicas,
            current_replicas: state.current_replicas,
            selector: state.selector.clone(),
        })
    }

    async fn list_pods(&self, _namespace: &str, _selector: &str) -> Result<Vec<Pod>, Report<ClusterError>> {
        Ok(self.state.lock().unwrap().pods.clone())
    }

    async fn update_replicas(&self, target: &ResourceRef, replicas: i32) -> Result<(), Report<ClusterError>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.update_attempts += 1;
            state.update_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.update_failures.pop_front() {
            return Err(Report::new(error));
        }
        if state.missing {
            return Err(Report::new(ClusterError::ResourceUnavailable {
                resource: target.to_string(),
            }));
        }
        state.desired_replicas = replicas;
        state.current_replicas = replicas;
        state.successful_updates.push(replicas);
        Ok(())
    }

    async fn autoscaler_targets(&self, _target: &ResourceRef) -> Result<bool, Report<ClusterError>> {
        Ok(self.state.lock().unwrap().has_autoscaler)
    }
}

//! Capabilities the control loop needs from the cluster.

use core::error::Error;

use error_stack::Report;
use k8s_openapi::api::core::v1::Pod;

use crate::config::ResourceRef;

/// Replica counts and pod selector of the managed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    /// `spec.replicas`
    pub desired_replicas: i32,
    /// `status.replicas`, falls back to the spec when no status was reported yet
    pub current_replicas: i32,
    /// Label selector matching the member pods, in `kubectl -l` syntax.
    pub selector: String,
}

/// Errors returned by cluster operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ClusterError {
    /// The managed resource or its namespace does not exist.
    #[display("{resource} was not found")]
    ResourceUnavailable { resource: String },
    /// Network failures, timeouts and server-side errors.
    #[display("Kubernetes API call failed: {message}")]
    Transient { message: String },
    /// The resource was modified between read and write.
    #[display("{resource} was modified concurrently")]
    Conflict { resource: String },
    /// The call was abandoned because shutdown was requested.
    #[display("Kubernetes API call cancelled")]
    Cancelled,
}

impl Error for ClusterError {}

impl ClusterError {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterError::ResourceUnavailable { .. } => "ResourceUnavailable",
            ClusterError::Transient { .. } => "TransientApiError",
            ClusterError::Conflict { .. } => "ConflictError",
            ClusterError::Cancelled => "Cancelled",
        }
    }
}

/// Cluster resource API used by the inspector and the reconciler.
///
/// Implemented by [`crate::infrastructure::k8s::KubeClusterApi`] in production
/// and by an in-memory fake in tests.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// Read the replica counts and selector of the target resource.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::ResourceUnavailable`] if the resource does not exist
    /// - [`ClusterError::Transient`] for retriable failures
    async fn get_resource(&self, target: &ResourceRef) -> Result<ResourceState, Report<ClusterError>>;

    /// List pods in `namespace` matching `selector`.
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, Report<ClusterError>>;

    /// Set the replica count of the target resource.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::Conflict`] if the resource changed since it was read
    /// - [`ClusterError::ResourceUnavailable`] if the resource does not exist
    /// - [`ClusterError::Transient`] for retriable failures
    async fn update_replicas(&self, target: &ResourceRef, replicas: i32) -> Result<(), Report<ClusterError>>;

    /// Whether a HorizontalPodAutoscaler already targets the resource.
    async fn autoscaler_targets(&self, target: &ResourceRef) -> Result<bool, Report<ClusterError>>;
}

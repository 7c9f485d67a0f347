//! Kubernetes integration module.
//!
//! This module implements the cluster capabilities of the control loop on top
//! of `kube`:
//! - [`KubeClusterApi`]: StatefulSet reads, pod listing and scale updates
//! - [`classify_pod`]: maps a pod object to an agent phase
//! - [`format_label_selector`]: renders a StatefulSet selector for list calls

pub mod cluster_api;
pub mod pod_status;
pub mod selector;

pub use cluster_api::KubeClusterApi;
pub use pod_status::classify_pod;
pub use pod_status::pod_ordinal;
pub use selector::format_label_selector;

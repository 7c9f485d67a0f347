//! Agent pool control loop.
//!
//! The main components are:
//! - [`AgentPoolInspector`]: reads the StatefulSet and classifies its pods
//! - [`estimate`]: turns a snapshot into a target replica count
//! - [`ScalingLimits`]: guard rails applied before a decision is written
//! - [`Reconciler`]: runs the periodic inspect, estimate, apply cycle

mod call;
pub mod estimator;
pub mod inspector;
pub mod limits;
#[cfg(test)]
pub(crate) mod mock;
pub mod reconciler;
pub mod status;
pub mod traits;
pub mod types;

pub use estimator::estimate;
pub use inspector::AgentPoolInspector;
pub use limits::ScalingLimits;
pub use reconciler::Reconciler;
pub use reconciler::ReconcileError;
pub use reconciler::TickOutcome;
pub use status::ReconcilerState;
pub use status::ScalerStatus;
pub use status::SharedStatus;
pub use traits::ClusterApi;
pub use traits::ClusterError;
pub use traits::ResourceState;
pub use types::*;

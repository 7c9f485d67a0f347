use crate::api::ApiServer;
use crate::domain::pool::ClusterApi;
use crate::domain::pool::Reconciler;

/// Long-running services, each moved into its own task on start.
pub struct ApplicationServices {
    pub reconciler: Reconciler<dyn ClusterApi>,
    pub api_server: ApiServer,
}

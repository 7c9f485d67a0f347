use std::sync::Arc;
use std::sync::RwLock;

use error_stack::Report;
use error_stack::ResultExt;

use crate::api::ApiServer;
use crate::app::services::ApplicationServices;
use crate::app::Application;
use crate::config::ConfigurationError;
use crate::config::ResourceRef;
use crate::config::ScalerArgs;
use crate::config::ScalerConfig;
use crate::domain::pool::ClusterApi;
use crate::domain::pool::Reconciler;
use crate::domain::pool::ScalerStatus;
use crate::domain::pool::SharedStatus;
use crate::infrastructure::k8s::KubeClusterApi;
use crate::infrastructure::kube_client::init_kube_client;
use crate::infrastructure::kube_client::CredentialStrategy;
use crate::infrastructure::metrics::MetricsFormat;
use crate::infrastructure::metrics::PoolMetrics;

/// Application builder
pub struct ApplicationBuilder {
    config: ScalerConfig,
    args: ScalerArgs,
}

impl ApplicationBuilder {
    /// `config` must be the validated form of `args`.
    pub fn new(config: ScalerConfig, args: ScalerArgs) -> Self {
        Self { config, args }
    }

    /// Connect to the cluster, check the target and wire the services.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::NoCredentials`] if no credential source works
    /// - [`ConfigurationError::AutoscalerConflict`] if an HPA targets the resource
    /// - [`ConfigurationError::AutoscalerCheckFailed`] if the HPA check fails
    pub async fn build(self) -> Result<Application, Report<ConfigurationError>> {
        tracing::info!("Building application components...");

        let client = init_kube_client(&CredentialStrategy::ordered(self.args.kubeconfig.clone())).await?;
        let cluster: Arc<dyn ClusterApi> = Arc::new(KubeClusterApi::new(client));

        verify_no_autoscaler(cluster.as_ref(), &self.config.resource).await?;

        Ok(Application::new(self.create_services(cluster)))
    }

    fn create_services(self, cluster: Arc<dyn ClusterApi>) -> ApplicationServices {
        let status: SharedStatus = Arc::new(RwLock::new(ScalerStatus::new(
            self.config.resource.friendly_name(),
        )));

        // Validation already rejected unknown formats.
        let metrics = self.args.metrics_file.as_ref().map(|_| {
            let format = self
                .args
                .metrics_format
                .parse::<MetricsFormat>()
                .unwrap_or(MetricsFormat::Influx);
            PoolMetrics::new(format, &self.config.resource)
        });

        let reconciler = Reconciler::new(Arc::new(self.config), cluster, status.clone(), metrics);
        let api_server = ApiServer::new(status, self.args.listen_addr);

        ApplicationServices {
            reconciler,
            api_server,
        }
    }
}

/// Refuse to manage a resource that a HorizontalPodAutoscaler already scales.
pub async fn verify_no_autoscaler<C: ClusterApi + ?Sized>(
    cluster: &C,
    resource: &ResourceRef,
) -> Result<(), Report<ConfigurationError>> {
    let targeted = cluster
        .autoscaler_targets(resource)
        .await
        .change_context_lazy(|| ConfigurationError::AutoscalerCheckFailed {
            resource: resource.to_string(),
        })?;

    if targeted {
        return Err(Report::new(ConfigurationError::AutoscalerConflict {
            resource: resource.to_string(),
        }));
    }
    Ok(())
}

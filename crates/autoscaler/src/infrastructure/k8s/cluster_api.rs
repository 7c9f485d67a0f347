use error_stack::Report;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::autoscaling::v1::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::api::PostParams;
use kube::Api;
use kube::Client;
use tracing::debug;

use crate::config::ResourceKind;
use crate::config::ResourceRef;
use crate::domain::pool::ClusterApi;
use crate::domain::pool::ClusterError;
use crate::domain::pool::ResourceState;
use crate::infrastructure::k8s::selector::format_label_selector;

const HTTP_NOT_FOUND: u16 = 404;
const HTTP_CONFLICT: u16 = 409;

/// [`ClusterApi`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn stateful_sets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a `kube` error to the control loop's error taxonomy.
pub(crate) fn classify_kube_error(err: &kube::Error, resource: &str) -> ClusterError {
    match err {
        kube::Error::Api(response) if response.code == HTTP_NOT_FOUND => {
            ClusterError::ResourceUnavailable {
                resource: resource.to_string(),
            }
        }
        kube::Error::Api(response) if response.code == HTTP_CONFLICT => ClusterError::Conflict {
            resource: resource.to_string(),
        },
        other => ClusterError::Transient {
            message: other.to_string(),
        },
    }
}

fn to_report(err: kube::Error, resource: &str) -> Report<ClusterError> {
    let context = classify_kube_error(&err, resource);
    Report::new(err).change_context(context)
}

#[async_trait::async_trait]
impl ClusterApi for KubeClusterApi {
    #[tracing::instrument(skip(self), fields(resource = %target.friendly_name(), namespace = %target.namespace))]
    async fn get_resource(&self, target: &ResourceRef) -> Result<ResourceState, Report<ClusterError>> {
        let resource = target.to_string();
        match target.kind {
            ResourceKind::StatefulSet => {
                let stateful_set = self
                    .stateful_sets(&target.namespace)
                    .get(&target.name)
                    .await
                    .map_err(|e| to_report(e, &resource))?;

                let spec = stateful_set.spec.ok_or_else(|| {
                    Report::new(ClusterError::ResourceUnavailable {
                        resource: resource.clone(),
                    })
                    .attach_printable("StatefulSet has no spec")
                })?;

                let desired_replicas = spec.replicas.unwrap_or(1);
                let current_replicas = stateful_set
                    .status
                    .map(|status| status.replicas)
                    .unwrap_or(desired_replicas);
                let selector = format_label_selector(&spec.selector);

                debug!(desired_replicas, current_replicas, %selector, "read stateful set");
                Ok(ResourceState {
                    desired_replicas,
                    current_replicas,
                    selector,
                })
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, Report<ClusterError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(selector))
            .await
            .map_err(|e| to_report(e, &format!("pods matching '{selector}' in namespace {namespace}")))?;
        Ok(pods.items)
    }

    #[tracing::instrument(skip(self), fields(resource = %target.friendly_name(), namespace = %target.namespace))]
    async fn update_replicas(&self, target: &ResourceRef, replicas: i32) -> Result<(), Report<ClusterError>> {
        let resource = target.to_string();
        match target.kind {
            ResourceKind::StatefulSet => {
                let api = self.stateful_sets(&target.namespace);
                let mut scale = api
                    .get_scale(&target.name)
                    .await
                    .map_err(|e| to_report(e, &resource))?;

                let spec = scale.spec.get_or_insert_with(Default::default);
                if spec.replicas == Some(replicas) {
                    debug!("scale already at {replicas} replicas");
                    return Ok(());
                }
                spec.replicas = Some(replicas);

                // The read resourceVersion travels with the body, so a concurrent
                // change makes the API server answer 409.
                let body = serde_json::to_vec(&scale).map_err(|e| {
                    Report::new(e).change_context(ClusterError::Transient {
                        message: format!("failed to encode scale of {resource}"),
                    })
                })?;

                api.replace_scale(&target.name, &PostParams::default(), body)
                    .await
                    .map_err(|e| to_report(e, &resource))?;
                Ok(())
            }
        }
    }

    async fn autoscaler_targets(&self, target: &ResourceRef) -> Result<bool, Report<ClusterError>> {
        let api: Api<HorizontalPodAutoscaler> = Api::namespaced(self.client.clone(), &target.namespace);
        let autoscalers = api
            .list(&ListParams::default())
            .await
            .map_err(|e| to_report(e, &format!("autoscalers in namespace {}", target.namespace)))?;

        let kind = target.kind.to_string();
        Ok(autoscalers.items.iter().any(|hpa| {
            hpa.spec.as_ref().is_some_and(|spec| {
                spec.scale_target_ref.kind.eq_ignore_ascii_case(&kind)
                    && spec.scale_target_ref.name == target.name
            })
        }))
    }
}

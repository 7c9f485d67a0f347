use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ContainerStatus;
use k8s_openapi::api::core::v1::Pod;

use crate::domain::pool::AgentPhase;

const POD_RUNNING: &str = "Running";

/// Classify an agent pod from its cluster-observable state.
///
/// A pod is [`AgentPhase::Unknown`] while it is terminating or not in the
/// `Running` phase. A running pod is [`AgentPhase::Busy`] when `busy_marker`
/// is set to `"true"` in its labels or annotations, even if a container is
/// not ready. Otherwise it is [`AgentPhase::Idle`] when every container is
/// running and ready, [`AgentPhase::Unknown`] if not.
pub fn classify_pod(pod: &Pod, busy_marker: &str) -> AgentPhase {
    if pod.metadata.deletion_timestamp.is_some() {
        return AgentPhase::Unknown;
    }

    let Some(status) = pod.status.as_ref() else {
        return AgentPhase::Unknown;
    };
    if status.phase.as_deref() != Some(POD_RUNNING) {
        return AgentPhase::Unknown;
    }

    // A job in flight outranks readiness: probes flap and sidecars restart mid-job.
    if marker_set(pod.metadata.labels.as_ref(), busy_marker)
        || marker_set(pod.metadata.annotations.as_ref(), busy_marker)
    {
        return AgentPhase::Busy;
    }

    let containers = status.container_statuses.as_deref().unwrap_or_default();
    if containers.is_empty() || !containers.iter().all(container_ready) {
        return AgentPhase::Unknown;
    }
    AgentPhase::Idle
}

fn container_ready(container: &ContainerStatus) -> bool {
    container.ready
        && container
            .state
            .as_ref()
            .is_some_and(|state| state.running.is_some() && state.terminated.is_none())
}

fn marker_set(values: Option<&BTreeMap<String, String>>, key: &str) -> bool {
    values
        .and_then(|values| values.get(key))
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Ordinal of a StatefulSet pod, `azp-agent-3` of set `azp-agent` is `3`.
pub fn pod_ordinal(pod_name: &str, set_name: &str) -> Option<u32> {
    pod_name
        .strip_prefix(set_name)?
        .strip_prefix('-')?
        .parse()
        .ok()
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use similar_asserts::assert_eq;

    use super::test_pods::*;
    use super::*;

    #[test]
    fn ready_pod_without_marker_is_idle() {
        assert_eq!(classify_pod(&running_pod("azp-agent-0", false), TEST_MARKER), AgentPhase::Idle);
    }

    #[test]
    fn marker_label_marks_busy() {
        assert_eq!(classify_pod(&running_pod("azp-agent-0", true), TEST_MARKER), AgentPhase::Busy);
    }

    #[test]
    fn marker_annotation_marks_busy() {
        let mut pod = running_pod("azp-agent-0", false);
        let mut annotations = BTreeMap::new();
        annotations.insert(TEST_MARKER.to_string(), "True".to_string());
        pod.metadata.annotations = Some(annotations);

        assert_eq!(classify_pod(&pod, TEST_MARKER), AgentPhase::Busy);
    }

    #[test]
    fn marker_with_other_value_is_idle() {
        let mut pod = running_pod("azp-agent-0", false);
        pod.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(TEST_MARKER.to_string(), "false".to_string());

        assert_eq!(classify_pod(&pod, TEST_MARKER), AgentPhase::Idle);
    }

    #[test]
    fn starting_pod_is_unknown_even_when_marked() {
        let mut pod = starting_pod("azp-agent-1");
        pod.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(TEST_MARKER.to_string(), "true".to_string());

        assert_eq!(classify_pod(&pod, TEST_MARKER), AgentPhase::Unknown);
    }

    #[test]
    fn marked_pod_with_unready_container_stays_busy() {
        assert_eq!(classify_pod(&unready_pod("azp-agent-2", true), TEST_MARKER), AgentPhase::Busy);
    }

    #[test]
    fn unmarked_pod_with_unready_container_is_unknown() {
        assert_eq!(classify_pod(&unready_pod("azp-agent-2", false), TEST_MARKER), AgentPhase::Unknown);
    }

    #[test]
    fn terminating_pod_is_unknown() {
        let mut pod = running_pod("azp-agent-0", false);
        pod.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));

        assert_eq!(classify_pod(&pod, TEST_MARKER), AgentPhase::Unknown);
    }

    #[test]
    fn pod_without_status_is_unknown() {
        let mut pod = running_pod("azp-agent-0", false);
        pod.status = None;

        assert_eq!(classify_pod(&pod, TEST_MARKER), AgentPhase::Unknown);
    }

    #[test]
    fn ordinal_is_parsed_from_stateful_set_pod_names() {
        assert_eq!(pod_ordinal("azp-agent-0", "azp-agent"), Some(0));
        assert_eq!(pod_ordinal("azp-agent-12", "azp-agent"), Some(12));
        assert_eq!(pod_ordinal("azp-agent", "azp-agent"), None);
        assert_eq!(pod_ordinal("azp-agent-x", "azp-agent"), None);
        assert_eq!(pod_ordinal("other-3", "azp-agent"), None);
    }
}

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

/// Render a [`LabelSelector`] in the string syntax accepted by list calls.
///
/// Unknown operators are dropped; the API server validates operators on write,
/// so a stored selector never contains one.
pub fn format_label_selector(selector: &LabelSelector) -> String {
    let labels = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{key}={value}"));

    let expressions = selector
        .match_expressions
        .iter()
        .flatten()
        .filter_map(format_requirement);

    labels.chain(expressions).collect::<Vec<_>>().join(",")
}

fn format_requirement(requirement: &LabelSelectorRequirement) -> Option<String> {
    let key = &requirement.key;
    let values = || requirement.values.as_deref().unwrap_or_default().join(",");
    match requirement.operator.as_str() {
        "In" => Some(format!("{key} in ({})", values())),
        "NotIn" => Some(format!("{key} notin ({})", values())),
        "Exists" => Some(key.clone()),
        "DoesNotExist" => Some(format!("!{key}")),
        _ => None,
    }
}

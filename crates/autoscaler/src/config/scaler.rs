use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use error_stack::Report;

use crate::config::cli::ScalerArgs;
use crate::config::duration::parse_duration;
use crate::infrastructure::metrics::MetricsFormat;

/// Kinds of pod pools the autoscaler can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ResourceKind {
    StatefulSet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::StatefulSet => write!(f, "StatefulSet"),
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "StatefulSet" => Ok(ResourceKind::StatefulSet),
            other => Err(format!("Unknown resource type '{other}'.")),
        }
    }
}

/// Identifies the managed pod pool.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn stateful_set(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::StatefulSet,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The name used to reference the resource with kubectl, e.g. `statefulset/azp-agent`.
    pub fn friendly_name(&self) -> String {
        format!("{}/{}", self.kind.to_string().to_lowercase(), self.name)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in namespace {}", self.friendly_name(), self.namespace)
    }
}

/// Validated, immutable autoscaler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerConfig {
    /// Free agents kept on top of the busy ones.
    pub min_free_agents: i32,
    /// Upper bound of replicas.
    pub max_replicas: i32,
    pub poll_interval: Duration,
    pub resource: ResourceRef,
    /// Minimum time between two scale downs, zero disables the delay.
    pub scale_down_delay: Duration,
    /// Maximum number of pods removed by one scale down.
    pub scale_down_max: Option<i32>,
    /// Label or annotation key marking a busy agent pod.
    pub busy_marker: String,
    /// Bound of a single cluster API call.
    pub call_timeout: Duration,
    /// Consecutive missing-resource ticks tolerated before giving up.
    pub unavailable_budget: u32,
}

pub const DEFAULT_BUSY_MARKER: &str = "azp-agent-autoscaler/busy";
pub const DEFAULT_MAX_REPLICAS: i32 = 100;
pub const DEFAULT_UNAVAILABLE_BUDGET: u32 = 3;

impl ScalerConfig {
    /// Config with the documented defaults for everything but the core settings.
    pub fn new(resource: ResourceRef, min_free_agents: i32, poll_interval: Duration) -> Self {
        Self {
            min_free_agents,
            max_replicas: DEFAULT_MAX_REPLICAS.max(min_free_agents),
            poll_interval,
            resource,
            scale_down_delay: Duration::ZERO,
            scale_down_max: None,
            busy_marker: DEFAULT_BUSY_MARKER.to_string(),
            call_timeout: poll_interval / 2,
            unavailable_budget: DEFAULT_UNAVAILABLE_BUDGET,
        }
    }
}

/// Errors that make the autoscaler refuse to start.
#[derive(Debug, derive_more::Display)]
pub enum ConfigurationError {
    #[display("Error(s) with arguments:\n{message}")]
    InvalidArguments { message: String },
    #[display("Could not load Kubernetes credentials from any source")]
    NoCredentials,
    #[display("{resource} cannot have a HorizontalPodAutoscaler attached for the autoscaler to work")]
    AutoscalerConflict { resource: String },
    #[display("Failed to verify that {resource} has no HorizontalPodAutoscaler")]
    AutoscalerCheckFailed { resource: String },
}

impl core::error::Error for ConfigurationError {}

impl TryFrom<&ScalerArgs> for ScalerConfig {
    type Error = Report<ConfigurationError>;

    /// Validate all arguments, reporting every problem at once.
    fn try_from(args: &ScalerArgs) -> Result<Self, Self::Error> {
        let mut errors: Vec<String> = Vec::new();

        if let Err(e) = utils::logging::parse_level(&args.log_level) {
            errors.push(format!("Invalid log level: {e}."));
        }
        if args.min < 1 {
            errors.push(format!(
                "Min argument cannot be less than 1 (got {}).",
                args.min
            ));
        }
        if args.max < args.min {
            errors.push(format!(
                "Max argument ({}) cannot be less than the minimum ({}).",
                args.max, args.min
            ));
        }

        let poll_interval = match parse_duration(&args.rate) {
            Ok(d) if d.is_zero() => {
                errors.push(format!("Rate '{}' must be greater than zero.", args.rate));
                None
            }
            Ok(d) => Some(d),
            Err(e) => {
                errors.push(format!("Error parsing rate: {e}."));
                None
            }
        };

        let scale_down_delay = match parse_duration(&args.scale_down_delay) {
            Ok(d) => Some(d),
            Err(e) => {
                errors.push(format!("Error parsing scale-down delay: {e}."));
                None
            }
        };

        if let Some(max) = args.scale_down_max {
            if max < 1 {
                errors.push(format!(
                    "Scale-down-max argument cannot be less than 1 (got {max})."
                ));
            }
        }

        let call_timeout = match &args.call_timeout {
            None => poll_interval.map(|d| d / 2),
            Some(raw) => match parse_duration(raw) {
                Ok(d) if d.is_zero() => {
                    errors.push(format!("Call timeout '{raw}' must be greater than zero."));
                    None
                }
                Ok(d) => Some(d),
                Err(e) => {
                    errors.push(format!("Error parsing call timeout: {e}."));
                    None
                }
            },
        };

        let kind = match args.resource_type.parse::<ResourceKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        if args.name.trim().is_empty() {
            errors.push(format!("{} name is required.", args.resource_type));
        }
        if args.namespace.trim().is_empty() {
            errors.push("Namespace is required.".to_string());
        }
        if args.busy_marker.trim().is_empty() {
            errors.push("Busy marker key is required.".to_string());
        }
        if args.unavailable_budget < 1 {
            errors.push("Unavailable budget cannot be less than 1.".to_string());
        }
        if let Err(e) = args.metrics_format.parse::<MetricsFormat>() {
            errors.push(format!("Invalid metrics format: {e}, expected 'influx' or 'json'."));
        }

        match (poll_interval, scale_down_delay, call_timeout, kind) {
            (Some(poll_interval), Some(scale_down_delay), Some(call_timeout), Some(kind))
                if errors.is_empty() =>
            {
                Ok(ScalerConfig {
                    min_free_agents: args.min,
                    max_replicas: args.max,
                    poll_interval,
                    resource: ResourceRef {
                        kind,
                        namespace: args.namespace.clone(),
                        name: args.name.clone(),
                    },
                    scale_down_delay,
                    scale_down_max: args.scale_down_max,
                    busy_marker: args.busy_marker.clone(),
                    call_timeout,
                    unavailable_budget: args.unavailable_budget,
                })
            }
            _ => Err(Report::new(ConfigurationError::InvalidArguments {
                message: errors.join("\n"),
            })),
        }
    }
}

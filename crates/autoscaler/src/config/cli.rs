use std::path::PathBuf;

use clap::Parser;
use utils::version;

/// Azure Pipelines agent autoscaler
#[derive(Parser, Clone, Debug)]
#[command(name = "azp-agent-autoscaler", about, long_about = None, version = &**version::VERSION)]
pub struct Cli {
    #[command(flatten)]
    pub scaler: ScalerArgs,
}

/// Raw command line arguments, validated into a [`crate::config::ScalerConfig`].
#[derive(clap::Args, Clone, Debug)]
pub struct ScalerArgs {
    #[arg(
        long,
        short = 'm',
        env = "AZP_AUTOSCALER_MIN",
        default_value_t = 1,
        allow_negative_numbers = true,
        help = "Minimum number of free agents to keep alive. Minimum of 1."
    )]
    pub min: i32,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_MAX",
        default_value_t = 100,
        allow_negative_numbers = true,
        help = "Maximum number of agents allowed."
    )]
    pub max: i32,

    #[arg(
        long,
        short = 'r',
        env = "AZP_AUTOSCALER_RATE",
        default_value = "PT10S",
        help = "ISO 8601 duration to check the number of agents, e.g. PT10S"
    )]
    pub rate: String,

    #[arg(
        long = "type",
        short = 't',
        visible_alias = "resource-type",
        env = "AZP_AUTOSCALER_RESOURCE_TYPE",
        default_value = "StatefulSet",
        help = "Resource type of the agent. Only StatefulSet is supported."
    )]
    pub resource_type: String,

    #[arg(
        long,
        short = 'n',
        env = "AZP_AUTOSCALER_NAME",
        default_value = "azp-agent",
        help = "The name of the StatefulSet."
    )]
    pub name: String,

    #[arg(
        long,
        visible_alias = "ns",
        env = "AZP_AUTOSCALER_NAMESPACE",
        default_value = "azp",
        help = "The namespace of the StatefulSet."
    )]
    pub namespace: String,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_SCALE_DOWN_DELAY",
        default_value = "PT0S",
        help = "Wait time after scaling down before scaling down again (ISO 8601 duration)."
    )]
    pub scale_down_delay: String,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_SCALE_DOWN_MAX",
        allow_negative_numbers = true,
        help = "Maximum number of pods removed by a single scale down (unlimited when unset)."
    )]
    pub scale_down_max: Option<i32>,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_BUSY_MARKER",
        default_value = "azp-agent-autoscaler/busy",
        help = "Pod label or annotation key set to \"true\" while the agent runs a job."
    )]
    pub busy_marker: String,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_CALL_TIMEOUT",
        help = "Timeout of a single Kubernetes API call (ISO 8601 duration, defaults to half the rate)."
    )]
    pub call_timeout: Option<String>,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_UNAVAILABLE_BUDGET",
        default_value_t = 3,
        help = "Consecutive ticks the StatefulSet may be missing before the autoscaler exits."
    )]
    pub unavailable_budget: u32,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (tried after the in-cluster config, before ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_LISTEN_ADDR",
        default_value = "0.0.0.0:10101",
        help = "Listen address for the health and status endpoints"
    )]
    pub listen_addr: String,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_LOG_LEVEL",
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error, off). RUST_LOG takes precedence."
    )]
    pub log_level: String,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Path for pool metrics, e.g. /logs/metrics.log (disabled when unset)"
    )]
    pub metrics_file: Option<PathBuf>,

    #[arg(
        long,
        env = "AZP_AUTOSCALER_METRICS_FORMAT",
        default_value = "influx",
        help = "Metrics format, either 'influx' or 'json'"
    )]
    pub metrics_format: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["azp-agent-autoscaler"]).expect("defaults should parse");
        let args = cli.scaler;

        assert_eq!(args.min, 1);
        assert_eq!(args.max, 100);
        assert_eq!(args.rate, "PT10S");
        assert_eq!(args.resource_type, "StatefulSet");
        assert_eq!(args.name, "azp-agent");
        assert_eq!(args.namespace, "azp");
        assert_eq!(args.scale_down_delay, "PT0S");
        assert_eq!(args.scale_down_max, None);
        assert_eq!(args.unavailable_budget, 3);
        assert_eq!(args.listen_addr, "0.0.0.0:10101");
        assert_eq!(args.metrics_format, "influx");
    }

    #[test]
    fn short_flags_and_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "azp-agent-autoscaler",
            "-m",
            "2",
            "-r",
            "PT30S",
            "--resource-type",
            "StatefulSet",
            "-n",
            "agents",
            "--ns",
            "ci",
        ])
        .expect("should parse short flags");
        let args = cli.scaler;

        assert_eq!(args.min, 2);
        assert_eq!(args.rate, "PT30S");
        assert_eq!(args.name, "agents");
        assert_eq!(args.namespace, "ci");
    }

    #[test]
    fn negative_min_reaches_validation() {
        let cli = Cli::try_parse_from(["azp-agent-autoscaler", "--min", "-1"])
            .expect("negative numbers are rejected by validation, not by the parser");
        assert_eq!(cli.scaler.min, -1);
    }
}

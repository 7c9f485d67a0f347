use std::process::ExitCode;

use autoscaler::app::ApplicationBuilder;
use autoscaler::config::Cli;
use autoscaler::config::ScalerConfig;
use autoscaler::logging;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

const EXIT_CONFIGURATION: u8 = 2;
const EXIT_RUNTIME: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    setup_global_hooks();

    let args = Cli::parse().scaler;

    // An invalid level is reported with the other argument errors below.
    let level = utils::logging::parse_level(&args.log_level).unwrap_or(LevelFilter::INFO);
    let _guard = match logging::init(level, args.metrics_file.as_deref()) {
        Ok(guard) => guard,
        Err(report) => {
            utils::logging::init(level);
            tracing::error!("{report:?}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let config = match ScalerConfig::try_from(&args) {
        Ok(config) => config,
        Err(report) => {
            tracing::error!("{report:?}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    tracing::info!("Starting azp-agent-autoscaler {}", &**version::VERSION);
    tracing::info!(
        min = config.min_free_agents,
        max = config.max_replicas,
        rate = ?config.poll_interval,
        scale_down_delay = ?config.scale_down_delay,
        scale_down_max = ?config.scale_down_max,
        "Managing {}",
        config.resource
    );

    let app = match ApplicationBuilder::new(config, args).build().await {
        Ok(app) => app,
        Err(report) => {
            tracing::error!("{report:?}");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Autoscaler failed: {e:?}");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

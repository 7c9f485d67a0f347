//! provides logging helpers

use std::fmt::{self};
use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

pub const METRICS_TARGET: &str = "metrics";

/// Writes the pre-encoded `msg` field of a metrics event as one line.
struct MetricsLineFormatter;

#[derive(Default)]
struct MessageVisitor {
    line: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "msg" {
            self.line = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "msg" {
            self.line = Some(format!("{value:?}"));
        }
    }
}

impl<S, N> FormatEvent<S, N> for MetricsLineFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        match visitor.line {
            Some(line) => writeln!(writer, "{line}"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, derive_more::Display)]
#[display("Failed to open metrics file {path}")]
pub struct LoggingError {
    path: String,
}

impl core::error::Error for LoggingError {}

fn is_metrics(target: &str) -> bool {
    target == METRICS_TARGET || target.starts_with("metrics::")
}

/// Initiate the global tracing subscriber.
///
/// Events are written to stderr. With a metrics file, events of the
/// `metrics` target go to a daily rolling file instead; the returned guard
/// flushes it and must be held until exit.
pub fn init(
    level: filter::LevelFilter,
    metrics_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, Report<LoggingError>> {
    let fmt_layer = utils::logging::get_fmt_layer(level)
        .with_filter(filter::filter_fn(|metadata| !is_metrics(metadata.target())));

    let Some(metrics_file) = metrics_file else {
        registry().with(fmt_layer).init();
        return Ok(None);
    };

    let error = || LoggingError {
        path: metrics_file.display().to_string(),
    };
    let directory = metrics_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = metrics_file
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| Report::new(error()))
        .attach_printable("metrics file needs a UTF-8 file name")?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(3)
        .build(directory)
        .change_context_lazy(error)?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let metrics_layer = layer()
        .event_format(MetricsLineFormatter)
        .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|metadata| is_metrics(metadata.target())));

    registry().with(fmt_layer).with(metrics_layer).init();
    Ok(Some(file_guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_target_is_routed_separately() {
        assert!(is_metrics("metrics"));
        assert!(is_metrics("metrics::pool"));
        assert!(!is_metrics("autoscaler::domain::pool::reconciler"));
        assert!(!is_metrics("metricsd"));
    }
}

use std::future::Future;
use std::time::Duration;

use error_stack::Report;
use tokio_util::sync::CancellationToken;

use super::traits::ClusterError;

/// Run a cluster call bounded by `timeout` and abandoned on cancellation.
pub(crate) async fn bounded<T, F>(
    what: &str,
    timeout: Duration,
    cancellation_token: &CancellationToken,
    call: F,
) -> Result<T, Report<ClusterError>>
where
    F: Future<Output = Result<T, Report<ClusterError>>>,
{
    tokio::select! {
        _ = cancellation_token.cancelled() => Err(Report::new(ClusterError::Cancelled)),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(result) => result,
            Err(_) => Err(Report::new(ClusterError::Transient {
                message: format!("{what} timed out after {timeout:?}"),
            })),
        },
    }
}

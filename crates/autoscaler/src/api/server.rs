use error_stack::Report;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::Endpoint;
use poem::EndpointExt;
use poem::Route;
use poem::Server;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::errors::ApiError;
use super::handlers::healthz;
use super::handlers::get_status;
use crate::domain::pool::SharedStatus;

/// HTTP server for liveness and status probes
pub struct ApiServer {
    status: SharedStatus,
    listen_addr: String,
}

/// Routes served by [`ApiServer`].
pub fn routes(shared_status: SharedStatus) -> impl Endpoint {
    Route::new()
        .at("/healthz", get(healthz))
        .at("/status", get(get_status))
        .data(shared_status)
        .with(Tracing)
}

impl ApiServer {
    pub fn new(status: SharedStatus, listen_addr: String) -> Self {
        Self { status, listen_addr }
    }

    /// Serve until cancelled.
    ///
    /// # Errors
    ///
    /// - [`ApiError::ServerError`] if the server fails to bind or stops unexpectedly
    pub async fn run(self, cancellation_token: CancellationToken) -> Result<(), Report<ApiError>> {
        info!("Starting HTTP API server on {}", self.listen_addr);

        let server = Server::new(TcpListener::bind(&self.listen_addr));

        tokio::select! {
            result = server.run(routes(self.status)) => match result {
                Ok(()) => {
                    info!("API server stopped normally");
                    Ok(())
                }
                Err(e) => {
                    error!("API server failed: {e}");
                    Err(Report::new(ApiError::ServerError {
                        message: format!("Server failed on {}: {e}", self.listen_addr),
                    }))
                }
            },
            _ = cancellation_token.cancelled() => {
                info!("API server shutdown requested");
                Ok(())
            }
        }
    }
}

use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiServer;
use crate::app::services::ApplicationServices;
use crate::domain::pool::ClusterApi;
use crate::domain::pool::Reconciler;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Task manager, responsible for starting and stopping the background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<Result<()>>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_token(cancellation_token: CancellationToken) -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token,
        }
    }

    pub fn spawn_all_tasks(&mut self, services: ApplicationServices) {
        let reconciler_task = self.spawn_reconciler_task(services.reconciler);
        self.tasks.push(reconciler_task);

        let api_server_task = self.spawn_api_server_task(services.api_server);
        self.tasks.push(api_server_task);
    }

    /// Wait for a shutdown signal or for the first task to finish.
    ///
    /// Either way the remaining tasks are cancelled and given a grace period.
    /// The error of a failed task is returned.
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        let signal_handler = {
            #[cfg(unix)]
            {
                use tokio::signal::unix::signal;
                use tokio::signal::unix::SignalKind;
                let mut sigterm = signal(SignalKind::terminate())?;
                let mut sigint = signal(SignalKind::interrupt())?;

                tokio::spawn(async move {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating graceful shutdown");
                        }
                        _ = sigint.recv() => {
                            tracing::info!("Received SIGINT, initiating graceful shutdown");
                        }
                    }
                })
            }
            #[cfg(not(unix))]
            {
                tokio::spawn(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                })
            }
        };

        self.wait_for(signal_handler).await
    }

    async fn wait_for(&mut self, shutdown: impl std::future::Future) -> Result<()> {
        if self.tasks.is_empty() {
            return Ok(());
        }

        let finished = tokio::select! {
            _ = shutdown => None,
            (result, index, _) = futures::future::select_all(&mut self.tasks) => Some((result, index)),
        };

        let outcome = match finished {
            None => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                Ok(())
            }
            Some((result, index)) => {
                self.tasks.remove(index);
                match result {
                    Ok(Ok(())) => {
                        tracing::info!("Task completed, stopping the remaining tasks");
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(anyhow::anyhow!("task panicked or was aborted: {e}")),
                }
            }
        };

        self.cancellation_token.cancel();
        self.wait_for_tasks_with_timeout(SHUTDOWN_GRACE_PERIOD).await;
        outcome
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Task failed during shutdown: {e:?}"),
                    Err(e) => tracing::error!("Task failed during shutdown: {e}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_reconciler_task(&self, reconciler: Reconciler<dyn ClusterApi>) -> JoinHandle<Result<()>> {
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            tracing::info!("Starting reconciler task");
            reconciler
                .run(token)
                .await
                .map_err(|report| anyhow::anyhow!("{report:?}"))?;
            tracing::info!("Reconciler task completed");
            Ok(())
        })
    }

    fn spawn_api_server_task(&self, api_server: ApiServer) -> JoinHandle<Result<()>> {
        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            api_server
                .run(token)
                .await
                .map_err(|report| anyhow::anyhow!("{report:?}"))?;
            tracing::info!("API server task completed");
            Ok(())
        })
    }
}

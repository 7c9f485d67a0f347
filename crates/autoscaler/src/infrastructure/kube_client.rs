use std::fmt;
use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;
use tracing::info;
use tracing::warn;

use crate::config::ConfigurationError;

/// One way of obtaining Kubernetes credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Service account token mounted into the pod.
    InCluster,
    /// An explicitly configured kubeconfig file.
    KubeconfigFile(PathBuf),
    /// `$KUBECONFIG` or `~/.kube/config`.
    DefaultKubeconfig,
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStrategy::InCluster => write!(f, "in-cluster config"),
            CredentialStrategy::KubeconfigFile(path) => write!(f, "kubeconfig {}", path.display()),
            CredentialStrategy::DefaultKubeconfig => write!(f, "default kubeconfig"),
        }
    }
}

#[derive(Debug, derive_more::Display)]
#[display("Failed to load Kubernetes credentials from {strategy}")]
pub struct CredentialError {
    strategy: String,
}

impl core::error::Error for CredentialError {}

impl CredentialStrategy {
    /// Resolution order: in-cluster first, then the explicit file, then the defaults.
    pub fn ordered(kubeconfig: Option<PathBuf>) -> Vec<CredentialStrategy> {
        let mut strategies = vec![CredentialStrategy::InCluster];
        if let Some(path) = kubeconfig {
            strategies.push(CredentialStrategy::KubeconfigFile(path));
        }
        strategies.push(CredentialStrategy::DefaultKubeconfig);
        strategies
    }

    /// Load a client configuration with this strategy.
    ///
    /// # Errors
    ///
    /// - [`CredentialError`] if the source is absent or unusable
    pub async fn load(&self) -> Result<Config, Report<CredentialError>> {
        let context = || CredentialError {
            strategy: self.to_string(),
        };
        match self {
            CredentialStrategy::InCluster => Config::incluster().change_context_lazy(context),
            CredentialStrategy::KubeconfigFile(path) => {
                let kubeconfig = Kubeconfig::read_from(path).change_context_lazy(context)?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .change_context_lazy(context)
            }
            CredentialStrategy::DefaultKubeconfig => {
                Config::from_kubeconfig(&KubeConfigOptions::default())
                    .await
                    .change_context_lazy(context)
            }
        }
    }
}

/// Build a client from the first strategy that yields a usable configuration.
///
/// # Errors
///
/// - [`ConfigurationError::NoCredentials`] if every strategy fails; each
///   failure is attached to the report
pub async fn init_kube_client(
    strategies: &[CredentialStrategy],
) -> Result<Client, Report<ConfigurationError>> {
    let mut failures: Vec<Report<CredentialError>> = Vec::new();

    for strategy in strategies {
        let attempt = match strategy.load().await {
            Ok(config) => Client::try_from(config).change_context(CredentialError {
                strategy: strategy.to_string(),
            }),
            Err(report) => Err(report),
        };

        match attempt {
            Ok(client) => {
                info!("Using Kubernetes credentials from {strategy}");
                return Ok(client);
            }
            Err(report) => {
                warn!("Could not use {strategy}: {report:?}");
                failures.push(report);
            }
        }
    }

    let mut report = Report::new(ConfigurationError::NoCredentials);
    for failure in failures {
        report = report.attach_printable(format!("{failure:?}"));
    }
    Err(report)
}

//! Authentication service seam and its OpenID Connect implementation

use std::future::Future;
use std::time::Duration;

use crate::host::{Cancelled, StoppingToken, wait_or_cancel};
use crate::http_client::{ProxyConfig, build_client};
use crate::model::config::{Config, ProviderRegistration};

use super::browser::BrowserLauncher;
use super::callback::CallbackListener;
use super::error::AuthError;
use super::types::AuthenticationResult;
use super::{github, oidc};

/// Timeout for individual discovery, token and profile requests
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Performs a complete interactive login against a named provider
pub trait AuthenticationService: Send + Sync {
    /// Run the browser-based flow and wait for it to finish
    ///
    /// Honors `stopping`: a stop request surfaces as [`AuthError::Cancelled`].
    fn authenticate_interactively(
        &self,
        provider: &str,
        stopping: &StoppingToken,
    ) -> impl Future<Output = Result<AuthenticationResult, AuthError>> + Send;
}

/// Client for the providers registered in the configuration file
pub struct OidcClientService {
    config: Config,
    http_client: reqwest::Client,
    browser: BrowserLauncher,
}

impl OidcClientService {
    pub fn new(config: Config, proxy: Option<ProxyConfig>) -> anyhow::Result<Self> {
        let http_client = build_client(proxy.as_ref(), HTTP_TIMEOUT_SECS, config.tls_backend)?;
        let browser = BrowserLauncher::new(config.open_browser);
        Ok(Self {
            config,
            http_client,
            browser,
        })
    }

    async fn authenticate(&self, provider: &str) -> Result<AuthenticationResult, AuthError> {
        let registration = self
            .config
            .provider(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        let listener = CallbackListener::bind(
            &self.config.callback_host,
            self.config.callback_port,
            &Config::callback_path(provider),
        )
        .await?;

        match registration {
            ProviderRegistration::Oidc(registration) => {
                oidc::authenticate(provider, registration, &self.http_client, listener, self.browser)
                    .await
            }
            ProviderRegistration::GitHub(registration) => {
                github::authenticate(provider, registration, &self.http_client, listener, self.browser)
                    .await
            }
        }
    }
}

impl AuthenticationService for OidcClientService {
    async fn authenticate_interactively(
        &self,
        provider: &str,
        stopping: &StoppingToken,
    ) -> Result<AuthenticationResult, AuthError> {
        let timeout = Duration::from_secs(self.config.login_timeout_secs);
        let login = tokio::time::timeout(timeout, self.authenticate(provider));

        match wait_or_cancel(login, stopping).await {
            Ok(Ok(result)) => result,
            Ok(Err(_elapsed)) => Err(AuthError::TimedOut),
            Err(Cancelled) => Err(AuthError::Cancelled),
        }
    }
}

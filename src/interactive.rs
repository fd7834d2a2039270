//! Interactive login loop
//!
//! Prompts for a provider, runs an interactive login through the
//! authentication service and reports the outcome, until the host stops.

use std::io::Write;

use crate::console::LineReader;
use crate::host::{ApplicationLifetime, Cancelled, StoppingToken, wait_or_cancel};
use crate::oauth::{AuthError, AuthenticationResult, AuthenticationService, Provider};

pub const PROMPT: &str =
    "Type '1' + ENTER to log in using the local server or '2' + ENTER to log in using GitHub.";
pub const LAUNCHING_BROWSER: &str = "Launching the system browser.";
pub const ABORTED: &str = "The authentication process was aborted.";
pub const ACCESS_DENIED: &str = "The authorization was denied by the end user.";
pub const GENERIC_FAILURE: &str = "An error occurred while trying to authenticate the user.";

enum Selection {
    Provider(Provider),
    Cancelled,
    EndOfInput,
}

/// Console front-end driving repeated interactive logins
pub struct InteractiveService<A, R, W> {
    lifetime: ApplicationLifetime,
    service: A,
    input: R,
    output: W,
}

impl<A, R, W> InteractiveService<A, R, W>
where
    A: AuthenticationService,
    R: LineReader,
    W: Write + Send,
{
    pub fn new(lifetime: ApplicationLifetime, service: A, input: R, output: W) -> Self {
        Self {
            lifetime,
            service,
            input,
            output,
        }
    }

    /// Run until the host requests a stop or the console input ends
    pub async fn run(mut self) -> anyhow::Result<()> {
        let stopping = self.lifetime.stopping_token();

        // Nothing is printed before the host has finished starting up
        if wait_or_cancel(self.lifetime.started(), &stopping).await.is_err() {
            tracing::debug!("Stopped before the application started");
            return Ok(());
        }

        while !stopping.is_stop_requested() {
            let provider = match self.prompt_for_provider(&stopping).await? {
                Selection::Provider(provider) => provider,
                Selection::Cancelled => {
                    self.write_line(ABORTED)?;
                    continue;
                }
                Selection::EndOfInput => {
                    tracing::info!("Console input closed");
                    self.lifetime.stop_application();
                    break;
                }
            };

            self.write_line(LAUNCHING_BROWSER)?;

            tracing::info!(provider = %provider, "Starting interactive login");
            let outcome = self
                .service
                .authenticate_interactively(provider.name(), &stopping)
                .await;
            let status = status_line(provider, &outcome);
            self.write_line(&status)?;
        }

        Ok(())
    }

    async fn prompt_for_provider(&mut self, stopping: &StoppingToken) -> anyhow::Result<Selection> {
        loop {
            self.write_line(PROMPT)?;

            let line = match wait_or_cancel(self.input.read_line(), stopping).await {
                Ok(line) => line?,
                Err(Cancelled) => return Ok(Selection::Cancelled),
            };

            let Some(line) = line else {
                return Ok(Selection::EndOfInput);
            };

            match Provider::from_menu_input(&line) {
                Some(provider) => return Ok(Selection::Provider(provider)),
                None => tracing::debug!(input = %line, "Ignoring unrecognized menu input"),
            }
        }
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.output, "{}", line)?;
        self.output.flush()
    }
}

/// Terminal status line for one login attempt, most specific failure first
fn status_line(provider: Provider, outcome: &Result<AuthenticationResult, AuthError>) -> String {
    match outcome {
        Ok(result) => match result.principal.name() {
            Some(name) => {
                tracing::info!(
                    provider = %result.principal.provider(),
                    access_token = ?result.access_token,
                    expires_in = ?result.expires_in,
                    "Login succeeded"
                );
                format!("Welcome, {}.", name)
            }
            None => {
                tracing::error!(
                    provider = %provider,
                    claims = ?result.principal.claim_names().collect::<Vec<_>>(),
                    "Login succeeded but the principal carries no name claim"
                );
                GENERIC_FAILURE.to_string()
            }
        },
        Err(AuthError::Cancelled) => ABORTED.to_string(),
        Err(e) if e.is_access_denied() => ACCESS_DENIED.to_string(),
        Err(e) => {
            tracing::warn!(provider = %provider, "Interactive login failed: {}", e);
            GENERIC_FAILURE.to_string()
        }
    }
}

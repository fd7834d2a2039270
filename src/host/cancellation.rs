//! Cancellable waits over futures that have no native cancellation

use std::future::Future;

use super::StoppingToken;

/// The stopping signal won the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the operation was cancelled")]
pub struct Cancelled;

/// Race `future` against the stopping signal
///
/// When the signal wins, the future is dropped. Whatever it was waiting on
/// (a console read on another thread, say) is abandoned rather than stopped
/// at its source. A stop that is already requested wins even if the future
/// is ready.
pub async fn wait_or_cancel<F, T>(future: F, token: &StoppingToken) -> Result<T, Cancelled>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.stopped() => Err(Cancelled),
        value = future => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ApplicationLifetime;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_value_when_future_wins() {
        let lifetime = ApplicationLifetime::new();
        let token = lifetime.stopping_token();

        let result = wait_or_cancel(async { 42 }, &token).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_wait_cancelled_when_signal_wins() {
        let lifetime = ApplicationLifetime::new();
        let token = lifetime.stopping_token();

        let stopper = {
            let lifetime = lifetime.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                lifetime.stop_application();
            })
        };

        let result = wait_or_cancel(std::future::pending::<()>(), &token).await;
        assert_eq!(result, Err(Cancelled));
        stopper.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_prefers_cancellation_when_already_stopped() {
        let lifetime = ApplicationLifetime::new();
        lifetime.stop_application();

        let result = wait_or_cancel(async { "ready" }, &lifetime.stopping_token()).await;
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test]
    async fn test_abandoned_future_is_dropped() {
        let lifetime = ApplicationLifetime::new();
        let token = lifetime.stopping_token();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        lifetime.stop_application();
        let result = wait_or_cancel(rx, &token).await;
        assert_eq!(result, Err(Cancelled));

        // The receiver went away with the abandoned future
        assert!(tx.send(()).is_err());
    }
}

//! Application lifetime signals

use std::sync::Arc;

use tokio::sync::watch;

struct Signals {
    started: watch::Sender<bool>,
    stopping: watch::Sender<bool>,
}

/// Host lifetime shared between `main` and background workers
///
/// Both signals are single-fire: once set they stay set, and every current
/// or future waiter observes them.
#[derive(Clone)]
pub struct ApplicationLifetime {
    signals: Arc<Signals>,
}

impl ApplicationLifetime {
    pub fn new() -> Self {
        let (started, _) = watch::channel(false);
        let (stopping, _) = watch::channel(false);
        Self {
            signals: Arc::new(Signals { started, stopping }),
        }
    }

    /// Mark the host as fully initialized. Only the first call has an effect.
    pub fn notify_started(&self) {
        if !self.signals.started.send_replace(true) {
            tracing::debug!("Application started");
        }
    }

    /// Wait until `notify_started` has been called
    pub async fn started(&self) {
        let mut receiver = self.signals.started.subscribe();
        // The sender lives in `self`, so this only resolves on a real start
        let _ = receiver.wait_for(|started| *started).await;
    }

    /// Request a graceful stop of every worker observing the stopping token
    pub fn stop_application(&self) {
        if !self.signals.stopping.send_replace(true) {
            tracing::info!("Application stop requested");
        }
    }

    pub fn stopping_token(&self) -> StoppingToken {
        StoppingToken {
            receiver: self.signals.stopping.subscribe(),
        }
    }
}

impl Default for ApplicationLifetime {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the process-wide stopping signal
#[derive(Clone, Debug)]
pub struct StoppingToken {
    receiver: watch::Receiver<bool>,
}

impl StoppingToken {
    pub fn is_stop_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once a stop has been requested
    ///
    /// A dropped lifetime counts as stopped: nobody is left to drive the host.
    pub async fn stopped(&self) {
        let mut receiver = self.receiver.clone();
        let _ = receiver.wait_for(|stopping| *stopping).await;
    }
}

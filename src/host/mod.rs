//! Process lifecycle plumbing
//!
//! A one-shot "application started" gate, a process-wide stopping signal
//! and a helper for racing arbitrary futures against that signal.

mod cancellation;
mod lifetime;

pub use cancellation::{Cancelled, wait_or_cancel};
pub use lifetime::{ApplicationLifetime, StoppingToken};

use std::fmt::Debug;
use std::time::Duration;

use rst_common::with_errors::thiserror::{self, Error};
use rst_common::with_tokio::tokio::sync::watch;

pub const DEFAULT_INTERVAL_MILLIS: u64 = 2000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PollError<E> {
    #[error("poll timeout after {attempts} attempts, last state: {last_state}")]
    PollTimeout { attempts: u32, last_state: String },

    #[error("poll cancelled after {attempts} attempts, last state: {last_state}")]
    Cancelled { attempts: u32, last_state: String },

    #[error("poll error: {0}")]
    Source(E),
}

/// `PollFailure` is implemented by each domain error that can be produced by a bounded polling loop
pub trait PollFailure {
    fn poll_timeout(key: String, attempts: u32, last_state: String) -> Self;
    fn poll_cancelled(key: String, attempts: u32, last_state: String) -> Self;
}

impl<E> PollError<E>
where
    E: PollFailure,
{
    /// `resolve` converts this error into the domain error, attaching the polled object's key
    pub fn resolve(self, key: &str) -> E {
        match self {
            PollError::PollTimeout {
                attempts,
                last_state,
            } => E::poll_timeout(key.to_string(), attempts, last_state),
            PollError::Cancelled {
                attempts,
                last_state,
            } => E::poll_cancelled(key.to_string(), attempts, last_state),
            PollError::Source(err) => err,
        }
    }
}

/// `PollOptions` bounds a polling loop
///
/// The first wait uses `interval`. When a `backoff_factor` greater than one is configured,
/// every following wait is multiplied by it, never exceeding `max_interval`. At least one
/// bound is always present, `max_attempts` falls back to [`DEFAULT_MAX_ATTEMPTS`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollOptions {
    interval: Duration,
    max_interval: Duration,
    backoff_factor: u32,
    max_attempts: Option<u32>,
    deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MILLIS),
            max_interval: Duration::from_millis(DEFAULT_INTERVAL_MILLIS),
            backoff_factor: 1,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            deadline: None,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// `with_deadline` bounds the loop by elapsed time only, the attempts bound is removed
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self.max_attempts = None;
        self
    }

    pub fn with_backoff(mut self, factor: u32, max_interval: Duration) -> Self {
        self.backoff_factor = factor.max(1);
        self.max_interval = max_interval.max(self.interval);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1 {
            return current;
        }

        current
            .checked_mul(self.backoff_factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// `Stopper` is the sending half of an explicit stop request
#[derive(Debug)]
pub struct Stopper {
    sender: watch::Sender<bool>,
}

impl Stopper {
    pub fn stop(&self) {
        let _ = self.sender.send(true);
    }
}

/// `StopSignal` is observed by a polling loop between two attempts
#[derive(Debug, Clone)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn channel() -> (Stopper, StopSignal) {
        let (sender, receiver) = watch::channel(false);
        (Stopper { sender }, StopSignal { receiver })
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }

    /// `stopped` resolves once a stop has been requested. A dropped [`Stopper`] never stops the loop.
    pub async fn stopped(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }

            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use table_test::table_test;

    #[test]
    fn test_next_interval() {
        let table = vec![
            ((1, 100, 10), 10),
            ((2, 100, 10), 20),
            ((2, 100, 80), 100),
            ((3, 50, 20), 50),
        ];

        for (validator, (factor, max, current), expected) in table_test!(table) {
            let opts = PollOptions::new(Duration::from_millis(10))
                .with_backoff(factor, Duration::from_millis(max));
            let next = opts.next_interval(Duration::from_millis(current));

            validator
                .given(&format!("factor: {}, max: {}, current: {}", factor, max, current))
                .when("next_interval")
                .then(&format!("it should be: {}", expected))
                .assert_eq(expected as u128, next.as_millis());
        }
    }

    #[test]
    fn test_default_is_bounded() {
        let opts = PollOptions::default();
        assert_eq!(opts.max_attempts(), Some(DEFAULT_MAX_ATTEMPTS));
        assert_eq!(opts.interval(), Duration::from_millis(DEFAULT_INTERVAL_MILLIS));

        let with_deadline = opts.with_deadline(Duration::from_secs(1));
        assert!(with_deadline.max_attempts().is_none());
        assert_eq!(with_deadline.deadline(), Some(Duration::from_secs(1)))
    }

    #[test]
    fn test_stop_signal() {
        let (stopper, signal) = StopSignal::channel();
        assert!(!signal.is_stopped());

        stopper.stop();
        assert!(signal.is_stopped())
    }
}

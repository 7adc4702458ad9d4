use std::fmt::Debug;
use std::future::Future;

use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::{self, time::Instant};

use super::types::{PollError, PollOptions, StopSignal};

const NO_STATE: &str = "none";

/// `await_terminal` repeatedly calls `poll_fn` until `is_terminal` accepts the returned state
///
/// The first poll is executed immediately. The loop ends with:
/// - the terminal state
/// - [`PollError::PollTimeout`] when the attempts or deadline bound is exhausted
/// - [`PollError::Cancelled`] when `stop` has been triggered
/// - [`PollError::Source`] as soon as `poll_fn` fails, it is never retried
///
/// A stop request is observed while waiting, so a cancelled loop returns without waiting
/// for the whole interval.
pub async fn await_terminal<TState, TError, TPollFn, TFuture, TTerminalFn>(
    mut poll_fn: TPollFn,
    is_terminal: TTerminalFn,
    options: &PollOptions,
    stop: Option<StopSignal>,
) -> Result<TState, PollError<TError>>
where
    TState: Debug,
    TPollFn: FnMut() -> TFuture,
    TFuture: Future<Output = Result<TState, TError>>,
    TTerminalFn: Fn(&TState) -> bool,
{
    let started = Instant::now();
    let mut stop = stop;
    let mut attempts: u32 = 0;
    let mut interval = options.interval();
    let mut last_state = NO_STATE.to_string();

    loop {
        if stop.as_ref().is_some_and(|signal| signal.is_stopped()) {
            return Err(PollError::Cancelled {
                attempts,
                last_state,
            });
        }

        attempts += 1;
        let state = poll_fn().await.map_err(PollError::Source)?;
        debug!("poll attempt {}: {:?}", attempts, state);

        if is_terminal(&state) {
            return Ok(state);
        }

        last_state = format!("{:?}", state);
        if options.max_attempts().is_some_and(|max| attempts >= max) {
            return Err(PollError::PollTimeout {
                attempts,
                last_state,
            });
        }

        if let Some(deadline) = options.deadline() {
            if started.elapsed() + interval >= deadline {
                return Err(PollError::PollTimeout {
                    attempts,
                    last_state,
                });
            }
        }

        match stop.as_mut() {
            Some(signal) => {
                tokio::select! {
                    _ = signal.stopped() => {
                        return Err(PollError::Cancelled { attempts, last_state });
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            None => tokio::time::sleep(interval).await,
        }

        interval = options.next_interval(interval);
    }
}

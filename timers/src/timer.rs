use std::time::Duration;

use tokio::task::spawn_local;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use vow_core::Promise;
use vow_types::Progress;

use crate::wait::Wait;

/// A promise that resolves with `payload` once `wait` has elapsed.
///
/// When `refresh` is shorter than the whole wait, the promise notifies the
/// elapsed share as [`Progress::Percent`] on every refresh tick, and once
/// more (100%) right before resolving. An invalid wait (negative, or a
/// deadline already passed) rejects immediately without a payload.
///
/// The timer task is aborted as soon as the promise completes by any means,
/// so canceling the promise stops both the ticks and the final resolution.
pub fn timer<T: Clone + 'static>(
    wait: impl Into<Wait>,
    payload: Option<T>,
    refresh: Option<Duration>,
) -> Promise<T> {
    let promise = Promise::new();
    let total = match wait.into().remaining() {
        Ok(total) => total,
        Err(err) => {
            tracing::debug!("timer rejected: {err}");
            promise.reject(None);
            return promise;
        }
    };
    let refresh = refresh.filter(|refresh| !refresh.is_zero() && *refresh < total);

    let target = promise.clone();
    let task = spawn_local(async move {
        let start = Instant::now();
        let deadline = start + total;
        if let Some(refresh) = refresh {
            let mut ticks = interval_at(start + refresh, refresh);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let sleep = sleep_until(deadline);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    () = &mut sleep => break,
                    _ = ticks.tick() => {
                        target.notify(Progress::percent_of(start.elapsed(), total));
                    }
                }
            }
            target.notify(Progress::Percent(100));
        } else {
            sleep_until(deadline).await;
        }
        target.resolve(payload);
    });

    let abort = task.abort_handle();
    promise.ever(move |_| abort.abort());
    promise
}

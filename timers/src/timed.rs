use std::time::Duration;

use vow_core::{Promise, Step};

use crate::timer::timer;

/// Time bounds on an existing promise.
pub trait Timed<T> {
    /// Reject this promise (without a payload) if it has not completed
    /// within `limit`.
    ///
    /// The guard timer is canceled as soon as this promise completes by any
    /// means, and canceling this promise cancels the guard. On a promise that
    /// has already completed this does nothing.
    fn timeout(&self, limit: Duration) -> &Self;

    /// A promise resolving with this promise's payload `wait` after it
    /// succeeds, reporting progress every `refresh` while waiting.
    fn delay(&self, wait: Duration, refresh: Option<Duration>) -> Promise<T>;
}

/// Start the guard timer for [`Timed::timeout`], or `None` if `promise` has
/// already completed.
fn arm_timeout<T: Clone + 'static>(promise: &Promise<T>, limit: Duration) -> Option<Promise<()>> {
    if promise.is_completed() {
        return None;
    }

    let guard: Promise<()> = timer(limit, None, None);
    let target = promise.clone();
    guard.done(move |_| {
        target.reject(None);
    });

    let on_cancel = guard.clone();
    promise.before_cancel(move || on_cancel.cancel());
    let on_complete = guard.clone();
    promise.always(move |_| {
        on_complete.cancel();
    });
    Some(guard)
}

impl<T: Clone + 'static> Timed<T> for Promise<T> {
    fn timeout(&self, limit: Duration) -> &Self {
        arm_timeout(self, limit);
        self
    }

    fn delay(&self, wait: Duration, refresh: Option<Duration>) -> Promise<T> {
        self.defer(move |payload| Ok(Step::Pending(timer(wait, payload, refresh))))
    }
}

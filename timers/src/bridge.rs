use tokio::sync::oneshot;
use tokio::task::spawn_local;
use vow_core::{AsPromise, Promise};
use vow_types::{Settlement, State};

/// A promise that resolves with `payload` on a later scheduler turn.
pub fn resolved<T: Clone + 'static>(payload: impl Into<Option<T>>) -> Promise<T> {
    let promise = Promise::new();
    let target = promise.clone();
    let payload = payload.into();
    spawn_local(async move {
        target.resolve(payload);
    });
    promise
}

/// A promise that rejects with `payload` on a later scheduler turn.
pub fn rejected<T: Clone + 'static>(payload: impl Into<Option<T>>) -> Promise<T> {
    let promise = Promise::new();
    let target = promise.clone();
    let payload = payload.into();
    spawn_local(async move {
        target.reject(payload);
    });
    promise
}

fn snapshot<T: Clone + 'static>(promise: &Promise<T>) -> Settlement<T> {
    match promise.state() {
        State::Resolved => Settlement::Resolved(promise.payload()),
        State::Rejected => Settlement::Rejected(promise.payload()),
        State::Pending | State::Canceled => Settlement::Canceled,
    }
}

/// Wait until `promise` completes and report how.
pub async fn settled<T: Clone + 'static>(promise: &impl AsPromise<T>) -> Settlement<T> {
    let promise = promise.as_promise();
    if promise.is_completed() {
        return snapshot(promise);
    }

    let (tx, rx) = oneshot::channel();
    let observed = promise.clone();
    promise.ever(move |_| {
        let _ = tx.send(snapshot(&observed));
    });
    rx.await.unwrap_or(Settlement::Canceled)
}

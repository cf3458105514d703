//! Promises derived from other promises: deferred transforms, piping, and
//! lenient wrapping.
//!
//! Every derived promise relays the source's progress and cancels the
//! source when it is itself canceled.

use vow_types::Progress;

use crate::promise::{AsPromise, Promise};
use crate::step::Step;

type Transform<T> = Box<dyn FnOnce(Option<T>) -> anyhow::Result<Step<T>>>;

fn relay_progress<T: Clone + 'static>(source: &Promise<T>, target: &Promise<T>) {
    let target = target.clone();
    source.progress(move |progress: &Progress| {
        target.notify(progress.clone());
    });
}

impl<T: Clone + 'static> Promise<T> {
    /// Derive a promise from this one's success.
    ///
    /// `on_success` receives the payload. Its result settles the derived
    /// promise: a value resolves it, `Step::Failed` or an `Err` rejects it,
    /// and a promise is piped into it (settlement, progress and
    /// cancellation). A rejection of this promise is forwarded unchanged.
    pub fn defer(
        &self,
        on_success: impl FnOnce(Option<T>) -> anyhow::Result<Step<T>> + 'static,
    ) -> Promise<T> {
        self.transform(Box::new(on_success), None)
    }

    /// Like [`Promise::defer`], with a handler for this promise's failure.
    ///
    /// The derived promise rejects whatever `on_failure` returns: with the
    /// returned value, or with the payload of the returned promise once it
    /// settles either way.
    pub fn defer_or(
        &self,
        on_success: impl FnOnce(Option<T>) -> anyhow::Result<Step<T>> + 'static,
        on_failure: impl FnOnce(Option<T>) -> anyhow::Result<Step<T>> + 'static,
    ) -> Promise<T> {
        self.transform(Box::new(on_success), Some(Box::new(on_failure)))
    }

    fn transform(&self, on_success: Transform<T>, on_failure: Option<Transform<T>>) -> Promise<T> {
        let derived = Promise::new();
        let source = self.clone();
        derived.before_cancel(move || source.cancel());
        relay_progress(self, &derived);

        let target = derived.clone();
        self.done(move |payload| match on_success(payload.cloned()) {
            Ok(Step::Pending(next)) => {
                next.pipe(&target);
            }
            Ok(Step::Ready(value)) => {
                target.resolve(value);
            }
            Ok(Step::Failed) => {
                target.reject(None);
            }
            Err(err) => {
                tracing::error!("defer: {err:#}");
                target.reject(None);
            }
        });

        let target = derived.clone();
        match on_failure {
            Some(on_failure) => self.fail(move |payload| match on_failure(payload.cloned()) {
                Ok(Step::Pending(next)) => {
                    let rejecter = target.clone();
                    next.always(move |payload| {
                        rejecter.reject(payload.cloned());
                    });
                    relay_progress(&next, &target);
                    target.before_cancel(move || next.cancel());
                }
                Ok(Step::Ready(value)) => {
                    target.reject(value);
                }
                Ok(Step::Failed) => {
                    target.reject(None);
                }
                Err(err) => {
                    tracing::error!("defer: {err:#}");
                    target.reject(None);
                }
            }),
            None => self.fail(move |payload| {
                target.reject(payload.cloned());
            }),
        };

        derived
    }

    /// Forward this promise's settlement and progress into `target`, and
    /// cancel this promise when `target` is canceled.
    pub fn pipe(&self, target: &impl AsPromise<T>) -> &Self {
        self.pipe_with(target, None, None)
    }

    /// Like [`Promise::pipe`], overriding the forwarded payloads when given.
    pub fn pipe_with(
        &self,
        target: &impl AsPromise<T>,
        resolve_with: Option<T>,
        reject_with: Option<T>,
    ) -> &Self {
        let target = target.as_promise();
        let (on_done, on_fail) = (target.clone(), target.clone());
        self.then(
            move |payload| {
                on_done.resolve(resolve_with.or_else(|| payload.cloned()));
            },
            move |payload| {
                on_fail.reject(reject_with.or_else(|| payload.cloned()));
            },
        );
        relay_progress(self, target);
        let source = self.clone();
        target.before_cancel(move || source.cancel());
        self
    }

    /// A promise that resolves once `step` completes, whichever way.
    ///
    /// A failure becomes a success carrying the same payload. Progress is
    /// relayed and canceling the wrapper cancels the source.
    pub fn lenient(step: impl Into<Step<T>>) -> Promise<T> {
        let wrapper = Promise::new();
        match step.into() {
            Step::Pending(source) => {
                relay_progress(&source, &wrapper);
                let target = wrapper.clone();
                source.always(move |payload| {
                    target.resolve(payload.cloned());
                });
                wrapper.before_cancel(move || source.cancel());
            }
            Step::Ready(payload) => {
                wrapper.resolve(payload);
            }
            Step::Failed => {
                wrapper.resolve(None);
            }
        }
        wrapper
    }
}

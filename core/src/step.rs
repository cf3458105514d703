//! What operands and stages evaluate to.
//!
//! The combinators accept three kinds of input: a promise to wait on, a plain
//! value (immediate success), or the failure signal. [`Step`] names those
//! three cases. Join operands and pipeline stages may also be functions
//! producing a `Step`, evaluated lazily by the combinator.

use std::fmt;

use crate::promise::{AsPromise, Promise};

/// Result of evaluating one operand or stage.
pub enum Step<T> {
    /// Immediate success. `None` is an absent payload.
    Ready(Option<T>),
    /// Immediate failure, carrying no payload.
    Failed,
    /// Wait on another promise and adopt its outcome.
    Pending(Promise<T>),
}

impl<T: Clone + 'static> Step<T> {
    #[must_use]
    pub fn value(value: T) -> Self {
        Step::Ready(Some(value))
    }

    #[must_use]
    pub fn empty() -> Self {
        Step::Ready(None)
    }

    #[must_use]
    pub fn wait(promise: &impl AsPromise<T>) -> Self {
        Step::Pending(promise.as_promise().clone())
    }

    /// `Failed` when `ok` is false, an empty success otherwise.
    #[must_use]
    pub fn check(ok: bool) -> Self {
        if ok { Step::Ready(None) } else { Step::Failed }
    }

    /// Lift into a promise. Plain outcomes become already-settled promises.
    #[must_use]
    pub fn into_promise(self) -> Promise<T> {
        match self {
            Step::Pending(promise) => promise,
            Step::Ready(payload) => {
                let promise = Promise::new();
                promise.resolve(payload);
                promise
            }
            Step::Failed => {
                let promise = Promise::new();
                promise.reject(None);
                promise
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Ready(payload) => f.debug_tuple("Ready").field(payload).finish(),
            Step::Failed => f.write_str("Failed"),
            Step::Pending(promise) => f.debug_tuple("Pending").field(promise).finish(),
        }
    }
}

impl<T> From<Promise<T>> for Step<T> {
    fn from(promise: Promise<T>) -> Self {
        Step::Pending(promise)
    }
}

impl From<()> for Step<()> {
    fn from((): ()) -> Self {
        Step::Ready(None)
    }
}

type Thunk<T> = Box<dyn FnOnce(&Promise<T>) -> anyhow::Result<Step<T>>>;

/// One input of [`crate::when`].
///
/// A thunk is invoked while the join is being assembled and receives the join
/// promise itself, so it may settle the whole join synchronously.
pub enum Operand<T> {
    Step(Step<T>),
    Thunk(Thunk<T>),
}

impl<T> Operand<T> {
    pub fn thunk(
        produce: impl FnOnce(&Promise<T>) -> anyhow::Result<Step<T>> + 'static,
    ) -> Self {
        Operand::Thunk(Box::new(produce))
    }
}

impl<T> From<Step<T>> for Operand<T> {
    fn from(step: Step<T>) -> Self {
        Operand::Step(step)
    }
}

impl<T> From<Promise<T>> for Operand<T> {
    fn from(promise: Promise<T>) -> Self {
        Operand::Step(Step::Pending(promise))
    }
}

type Run<T> = Box<dyn FnOnce(&Promise<T>, Option<T>) -> anyhow::Result<Step<T>>>;

/// One stage of [`crate::chain`].
///
/// A running stage receives the previous stage's payload (`None` for the
/// first stage). An `Err` counts as a failure of that stage.
pub enum Stage<T> {
    Step(Step<T>),
    Run(Run<T>),
}

impl<T: 'static> Stage<T> {
    pub fn run(run: impl FnOnce(Option<T>) -> anyhow::Result<Step<T>> + 'static) -> Self {
        Stage::Run(Box::new(move |_, payload| run(payload)))
    }

    /// Like [`Stage::run`], with access to the pipeline promise (to notify
    /// its listeners, or to settle it early).
    pub fn run_with(
        run: impl FnOnce(&Promise<T>, Option<T>) -> anyhow::Result<Step<T>> + 'static,
    ) -> Self {
        Stage::Run(Box::new(run))
    }
}

impl<T> From<Step<T>> for Stage<T> {
    fn from(step: Step<T>) -> Self {
        Stage::Step(step)
    }
}

impl<T> From<Promise<T>> for Stage<T> {
    fn from(promise: Promise<T>) -> Self {
        Stage::Step(Step::Pending(promise))
    }
}

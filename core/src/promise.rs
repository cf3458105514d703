//! The settlement cell and the [`Promise`] handle wrapping it.
//!
//! # Queues
//!
//! A pending cell keeps four queues:
//!
//! - success and failure callbacks, drained last-registered-first when the
//!   cell settles (an `always` callback sits in both as one shared slot)
//! - progress listeners, notified most-recent-first on every `notify`
//! - cancellation hooks, run in registration order only on `cancel`
//!
//! Every queue is released the moment the cell completes. Registering a
//! success or failure callback on an already-settled cell runs it
//! synchronously, in the caller's stack frame.
//!
//! # Borrowing
//!
//! No `RefCell` borrow is held while user code runs. Settlement first flips
//! the state and moves the queues out, then drops the borrow and fires.
//! Callbacks are therefore free to register, settle or cancel any promise,
//! including the one currently firing.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use vow_types::{Progress, State};

use crate::join::when;
use crate::step::{Operand, Step};

type Callback<T> = Box<dyn FnOnce(Option<&T>)>;

/// A callback that may sit in several queues but runs at most once.
type Slot<T> = Rc<RefCell<Option<Callback<T>>>>;

type Listener = Rc<dyn Fn(&Progress)>;

type CancelHook = Box<dyn FnOnce() -> Step<()>>;

fn slot<T>(callback: impl FnOnce(Option<&T>) + 'static) -> Slot<T> {
    let callback: Callback<T> = Box::new(callback);
    Rc::new(RefCell::new(Some(callback)))
}

fn fire<T>(slot: &Slot<T>, payload: Option<&T>) {
    let callback = slot.borrow_mut().take();
    if let Some(callback) = callback {
        callback(payload);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Success,
    Failure,
    Both,
}

struct Cell<T> {
    state: State,
    payload: Option<T>,
    on_success: Vec<Slot<T>>,
    on_failure: Vec<Slot<T>>,
    on_progress: Vec<Listener>,
    on_cancel: Vec<CancelHook>,
}

/// Queues moved out of a completed cell, dropped once no borrow is held.
type Released<T> = (Vec<Slot<T>>, Vec<Slot<T>>, Vec<Listener>, Vec<CancelHook>);

impl<T> Cell<T> {
    fn new() -> Self {
        Self {
            state: State::Pending,
            payload: None,
            on_success: Vec::new(),
            on_failure: Vec::new(),
            on_progress: Vec::new(),
            on_cancel: Vec::new(),
        }
    }

    fn release(&mut self) -> Released<T> {
        (
            mem::take(&mut self.on_success),
            mem::take(&mut self.on_failure),
            mem::take(&mut self.on_progress),
            mem::take(&mut self.on_cancel),
        )
    }
}

/// Implemented by every type that *is* a promise: the plain handle, a
/// pipeline, and producer-backed promises built with [`crate::extend`].
///
/// Anything implementing it can be handed to `when`, `chain` or `pipe`.
pub trait AsPromise<T> {
    fn as_promise(&self) -> &Promise<T>;
}

/// Handle to a single-assignment asynchronous result.
///
/// Cloning the handle shares the same cell. A promise settles at most once:
/// the first of `resolve`, `reject` or `cancel` wins and later calls are
/// ignored.
pub struct Promise<T> {
    cell: Rc<RefCell<Cell<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cell.try_borrow().map(|cell| cell.state).ok();
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T> AsPromise<T> for Promise<T> {
    fn as_promise(&self) -> &Promise<T> {
        self
    }
}

impl<T: Clone + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Promise<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Rc::new(RefCell::new(Cell::new())),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> State {
        self.cell.borrow().state
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state() == State::Resolved
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state() == State::Rejected
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.state() == State::Canceled
    }

    /// True once resolved, rejected or canceled.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }

    /// The payload the promise settled with. `None` while pending and after
    /// cancellation.
    #[must_use]
    pub fn payload(&self) -> Option<T> {
        self.cell.borrow().payload.clone()
    }

    /// True if both handles share one cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Run `callback` on success. Runs immediately if already resolved;
    /// ignored if rejected or canceled.
    pub fn done(&self, callback: impl FnOnce(Option<&T>) + 'static) -> &Self {
        self.register(Channel::Success, slot(callback));
        self
    }

    /// Run `callback` on failure. Runs immediately if already rejected;
    /// ignored if resolved or canceled.
    pub fn fail(&self, callback: impl FnOnce(Option<&T>) + 'static) -> &Self {
        self.register(Channel::Failure, slot(callback));
        self
    }

    /// Run `callback` once on success or failure. Ignored on canceled promises.
    pub fn always(&self, callback: impl FnOnce(Option<&T>) + 'static) -> &Self {
        self.register(Channel::Both, slot(callback));
        self
    }

    pub fn then(
        &self,
        on_success: impl FnOnce(Option<&T>) + 'static,
        on_failure: impl FnOnce(Option<&T>) + 'static,
    ) -> &Self {
        self.done(on_success).fail(on_failure)
    }

    /// Listen for progress notifications until the promise completes.
    pub fn progress(&self, listener: impl Fn(&Progress) + 'static) -> &Self {
        let mut cell = self.cell.borrow_mut();
        if !cell.state.is_completed() {
            cell.on_progress.push(Rc::new(listener));
        }
        drop(cell);
        self
    }

    /// Run `callback` exactly once however the promise completes, including
    /// cancellation (where it receives no payload).
    pub fn ever(&self, callback: impl FnOnce(Option<&T>) + 'static) -> &Self {
        let shared = slot(callback);
        self.register(Channel::Both, Rc::clone(&shared));
        self.before_cancel(move || fire(&shared, None))
    }

    /// Register a teardown hook, run only if the promise is canceled.
    ///
    /// The hook may return a promise; [`Promise::cancel`] waits on it.
    pub fn before_cancel<R>(&self, hook: impl FnOnce() -> R + 'static) -> &Self
    where
        R: Into<Step<()>>,
    {
        let mut cell = self.cell.borrow_mut();
        if !cell.state.is_completed() {
            cell.on_cancel.push(Box::new(move || hook().into()));
        }
        drop(cell);
        self
    }

    fn register(&self, channel: Channel, slot: Slot<T>) {
        let payload = {
            let mut cell = self.cell.borrow_mut();
            match (cell.state, channel) {
                (State::Pending, Channel::Success) => {
                    cell.on_success.push(slot);
                    return;
                }
                (State::Pending, Channel::Failure) => {
                    cell.on_failure.push(slot);
                    return;
                }
                (State::Pending, Channel::Both) => {
                    cell.on_success.push(Rc::clone(&slot));
                    cell.on_failure.push(slot);
                    return;
                }
                (State::Resolved, Channel::Success | Channel::Both)
                | (State::Rejected, Channel::Failure | Channel::Both) => cell.payload.clone(),
                _ => return,
            }
        };
        fire(&slot, payload.as_ref());
    }

    // ------------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------------

    pub fn resolve(&self, payload: impl Into<Option<T>>) -> &Self {
        self.settle(State::Resolved, payload.into());
        self
    }

    pub fn reject(&self, payload: impl Into<Option<T>>) -> &Self {
        self.settle(State::Rejected, payload.into());
        self
    }

    fn settle(&self, state: State, payload: Option<T>) {
        let (mut queue, payload, released) = {
            let mut cell = self.cell.borrow_mut();
            if cell.state.is_completed() {
                return;
            }
            cell.state = state;
            cell.payload = payload;
            let queue = if state == State::Resolved {
                mem::take(&mut cell.on_success)
            } else {
                mem::take(&mut cell.on_failure)
            };
            let released = cell.release();
            (queue, cell.payload.clone(), released)
        };
        drop(released);
        while let Some(slot) = queue.pop() {
            fire(&slot, payload.as_ref());
        }
    }

    /// Deliver `progress` to every listener, most recent first. No-op once
    /// completed.
    pub fn notify(&self, progress: Progress) -> &Self {
        let listeners = {
            let cell = self.cell.borrow();
            if cell.state.is_completed() {
                return self;
            }
            cell.on_progress.clone()
        };
        for listener in listeners.iter().rev() {
            if self.is_completed() {
                break;
            }
            listener(&progress);
        }
        self
    }

    /// Cancel the promise.
    ///
    /// Returns a promise that resolves once every cancellation hook's teardown
    /// has finished. Canceling a completed promise does nothing and returns an
    /// already-resolved promise.
    pub fn cancel(&self) -> Promise<()> {
        let hooks = {
            let mut cell = self.cell.borrow_mut();
            if cell.state.is_completed() {
                None
            } else {
                cell.state = State::Canceled;
                cell.payload = None;
                let (success, failure, progress, hooks) = cell.release();
                Some((hooks, (success, failure, progress)))
            }
        };
        let Some((hooks, released)) = hooks else {
            let noop = Promise::new();
            noop.resolve(None);
            return noop;
        };
        drop(released);
        when(
            hooks
                .into_iter()
                .map(|hook| Operand::thunk(move |_| Ok(hook()))),
        )
    }
}

//! Producer-backed promises.
//!
//! A [`Producer`] is a leaf operation (a network request, a subprocess, a
//! device read) that starts as soon as it is wrapped and settles its promise
//! from its own completion events. [`extend`] wraps it into an
//! [`Extended`], which behaves exactly like a [`Promise`] and composes with
//! every combinator.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::promise::{AsPromise, Promise};

/// Construction logic for a promise-backed operation.
pub trait Producer<T: Clone + 'static>: 'static {
    /// Start the operation. It must eventually settle `promise` exactly once,
    /// either right here or from a later completion event.
    fn initialize(&mut self, promise: &Promise<T>);

    /// Called once the promise has completed by any means, cancellation
    /// included. Drop listeners, abort in-flight work.
    fn release(&mut self) {}
}

/// A promise whose cell is settled by a [`Producer`].
pub struct Extended<P, T> {
    promise: Promise<T>,
    producer: Rc<RefCell<P>>,
}

impl<P, T> Clone for Extended<P, T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<P, T> fmt::Debug for Extended<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extended")
            .field("promise", &self.promise)
            .finish_non_exhaustive()
    }
}

/// Wrap `producer` into a promise and start it immediately.
pub fn extend<T, P>(producer: P) -> Extended<P, T>
where
    T: Clone + 'static,
    P: Producer<T>,
{
    Extended::new(producer)
}

impl<P, T> Extended<P, T>
where
    T: Clone + 'static,
    P: Producer<T>,
{
    pub fn new(producer: P) -> Self {
        let promise = Promise::new();
        let producer = Rc::new(RefCell::new(producer));
        producer.borrow_mut().initialize(&promise);

        // Registered after `initialize` so a producer settling synchronously
        // is not re-entered while still borrowed.
        if promise.is_canceled() {
            producer.borrow_mut().release();
        } else {
            let releaser = Rc::clone(&producer);
            promise.ever(move |_| releaser.borrow_mut().release());
        }

        Self { promise, producer }
    }

    /// Inspect the producer. Must not settle the promise from inside `inspect`.
    pub fn with_producer<R>(&self, inspect: impl FnOnce(&P) -> R) -> R {
        inspect(&self.producer.borrow())
    }

    #[must_use]
    pub fn promise(&self) -> &Promise<T> {
        &self.promise
    }

    #[must_use]
    pub fn into_promise(self) -> Promise<T> {
        self.promise
    }
}

impl<P, T> Deref for Extended<P, T> {
    type Target = Promise<T>;

    fn deref(&self) -> &Self::Target {
        &self.promise
    }
}

impl<P, T> AsPromise<T> for Extended<P, T> {
    fn as_promise(&self) -> &Promise<T> {
        &self.promise
    }
}

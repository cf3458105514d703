//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tokio::time::Instant;
use vow_core::Promise;
use vow_types::Progress;

/// Shared log plus a handle to push into it from callbacks.
pub type Log<T> = Rc<RefCell<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    Rc::new(RefCell::new(Vec::new()))
}

/// Record every progress notification `promise` delivers.
pub fn record_progress<T: Clone + 'static>(promise: &Promise<T>) -> Log<Progress> {
    let seen = log();
    let sink = Rc::clone(&seen);
    promise.progress(move |progress| sink.borrow_mut().push(progress.clone()));
    seen
}

/// Record the instant `promise` resolves.
pub fn record_resolution<T: Clone + 'static>(promise: &Promise<T>) -> Rc<RefCell<Option<Instant>>> {
    let at = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&at);
    promise.done(move |_| *sink.borrow_mut() = Some(Instant::now()));
    at
}

pub fn percents(seen: &Log<Progress>) -> Vec<u8> {
    seen.borrow().iter().filter_map(Progress::as_percent).collect()
}

//! Settlement cell: single assignment and late registration.

use std::cell::Cell;
use std::rc::Rc;

use vow_core::Promise;
use vow_types::State;

use crate::common::log;

#[test]
fn repeated_settlement_keeps_the_first_outcome() {
    for first in [State::Resolved, State::Rejected, State::Canceled] {
        let promise: Promise<&str> = Promise::new();
        let settle = |state| match state {
            State::Resolved => {
                promise.resolve("first");
            }
            State::Rejected => {
                promise.reject("first");
            }
            State::Canceled => {
                promise.cancel();
            }
            State::Pending => {}
        };

        settle(first);
        let (state, payload) = (promise.state(), promise.payload());
        for again in [State::Resolved, State::Rejected, State::Canceled] {
            settle(again);
            assert_eq!(promise.state(), state);
            assert_eq!(promise.payload(), payload);
        }
        assert_eq!(state, first);
    }
}

#[test]
fn late_done_runs_once_synchronously_with_the_stored_payload() {
    let promise: Promise<i32> = Promise::new();
    promise.resolve(42);

    let seen = log();
    let sink = Rc::clone(&seen);
    promise.done(move |payload| sink.borrow_mut().push(payload.copied()));
    assert_eq!(*seen.borrow(), vec![Some(42)]);

    promise.resolve(43);
    assert_eq!(*seen.borrow(), vec![Some(42)]);
}

#[test]
fn late_fail_after_resolution_never_runs() {
    let promise: Promise<i32> = Promise::new();
    promise.resolve(1);

    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    promise.fail(move |_| sink.set(sink.get() + 1));
    promise.reject(2);
    assert_eq!(hits.get(), 0);
}

#[test]
fn callbacks_can_settle_other_promises_reentrantly() {
    let first: Promise<i32> = Promise::new();
    let second: Promise<i32> = Promise::new();

    let forward = second.clone();
    first.done(move |payload| {
        forward.resolve(payload.map(|n| n + 1));
    });
    let back = first.clone();
    second.done(move |_| {
        back.reject(0);
    });

    first.resolve(1);
    assert!(first.is_resolved());
    assert_eq!(second.payload(), Some(2));
}

//! Parallel join over mixed operands.

use vow_core::{Operand, Promise, Step, when};

#[test]
fn empty_join_resolves_immediately_without_payload() {
    let all: Promise<i32> = when(Vec::<Step<i32>>::new());
    assert!(all.is_resolved());
    assert_eq!(all.payload(), None);
}

#[test]
fn plain_values_resolve_synchronously() {
    let all = when([Step::value(1), Step::value(2), Step::value(3)]);
    assert!(all.is_resolved());
    assert_eq!(all.payload(), None);
}

#[test]
fn first_rejection_wins_and_later_results_are_ignored() {
    let a: Promise<&str> = Promise::new();
    let b: Promise<&str> = Promise::new();
    let all = when([a.clone(), b.clone()]);

    a.reject("x");
    b.resolve("ok");
    assert!(all.is_rejected());
    assert_eq!(all.payload(), Some("x"));

    b.reject("y");
    assert!(all.is_rejected());
    assert_eq!(all.payload(), Some("x"));
}

#[test]
fn mixed_operands_join_promises_values_and_thunks() {
    let pending: Promise<i32> = Promise::new();
    let all = when([
        Operand::from(Step::value(1)),
        Operand::from(pending.clone()),
        Operand::thunk(|_| Ok(Step::empty())),
    ]);
    assert!(!all.is_completed());

    pending.resolve(2);
    assert!(all.is_resolved());
}

#[test]
fn lenient_operands_keep_the_join_alive() {
    let flaky: Promise<&str> = Promise::new();
    let steady: Promise<&str> = Promise::new();
    let all = when([Promise::lenient(flaky.clone()), steady.clone()]);

    flaky.reject("offline");
    steady.resolve("ok");
    assert!(all.is_resolved());
}

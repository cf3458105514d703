//! Parallel join: one promise for many independent operations.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::promise::Promise;
use crate::step::{Operand, Step};

struct Join<T> {
    total: usize,
    settled: usize,
    /// First failure payload observed, if any.
    failure: Option<Option<T>>,
    /// Promise operands, held until the join completes.
    children: Vec<Promise<T>>,
}

impl<T> Join<T> {
    /// Count one settled operand. Returns the join's outcome once the last
    /// operand has settled.
    fn settle(&mut self, failure: Option<Option<T>>) -> Option<Result<(), Option<T>>> {
        if let Some(payload) = failure
            && self.failure.is_none()
        {
            self.failure = Some(payload);
        }
        self.settled += 1;
        if self.settled < self.total {
            return None;
        }
        self.children.clear();
        Some(self.failure.take().map_or(Ok(()), Err))
    }
}

fn settle_operand<T: Clone + 'static>(
    all: &Promise<T>,
    join: &Rc<RefCell<Join<T>>>,
    failure: Option<Option<T>>,
) {
    let outcome = join.borrow_mut().settle(failure);
    match outcome {
        Some(Ok(())) => {
            all.resolve(None);
        }
        Some(Err(payload)) => {
            all.reject(payload);
        }
        None => {}
    }
}

/// Join every operand into one promise.
///
/// The join settles once every operand has settled: it resolves (with no
/// payload) if all succeeded, and otherwise rejects with the payload of the
/// first failure observed. Zero operands resolve immediately.
///
/// Operands are evaluated in order. Thunks run immediately and may settle
/// the join themselves; once the join is complete the remaining operands are
/// not evaluated. A thunk returning `Err` counts as a failed operand.
///
/// Canceling the join cancels every promise operand still held and resolves
/// its teardown promise once those cancellations have finished.
pub fn when<T, I>(operands: I) -> Promise<T>
where
    T: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Operand<T>>,
{
    let operands: Vec<Operand<T>> = operands.into_iter().map(Into::into).collect();
    let all = Promise::new();
    if operands.is_empty() {
        all.resolve(None);
        return all;
    }

    let join = Rc::new(RefCell::new(Join {
        total: operands.len(),
        settled: 0,
        failure: None,
        children: Vec::new(),
    }));

    let teardown = Rc::clone(&join);
    all.before_cancel(move || {
        let children = mem::take(&mut teardown.borrow_mut().children);
        let canceled: Vec<Promise<()>> = children.iter().map(Promise::cancel).collect();
        Step::Pending(when(canceled))
    });

    for (index, operand) in operands.into_iter().enumerate() {
        let step = match operand {
            Operand::Step(step) => step,
            Operand::Thunk(produce) => {
                let step = produce(&all).unwrap_or_else(|err| {
                    tracing::error!(operand = index, "join operand failed: {err:#}");
                    Step::Failed
                });
                if all.is_completed() {
                    return all;
                }
                step
            }
        };

        match step {
            Step::Pending(child) => {
                join.borrow_mut().children.push(child.clone());
                let (on_done, on_fail) = (Rc::clone(&join), Rc::clone(&join));
                let (all_done, all_fail) = (all.clone(), all.clone());
                child.then(
                    move |_| settle_operand(&all_done, &on_done, None),
                    move |payload| settle_operand(&all_fail, &on_fail, Some(payload.cloned())),
                );
            }
            Step::Ready(_) => settle_operand(&all, &join, None),
            Step::Failed => settle_operand(&all, &join, Some(None)),
        }

        if all.is_completed() {
            return all;
        }
    }

    all
}

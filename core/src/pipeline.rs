//! Sequential pipeline: run stages one after the other, threading each
//! stage's payload into the next.
//!
//! A pipeline is built idle and runs once [`Pipeline::start`] is called.
//! Without the lazy flag the first failing stage rejects the pipeline and
//! discards the rest. With it, the remaining stages still run (receiving the
//! last successful payload) and the pipeline rejects with the first failure
//! payload once the sequence is exhausted.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::promise::{AsPromise, Promise};
use crate::step::{Stage, Step};

struct Driver<T> {
    stages: VecDeque<Stage<T>>,
    /// Index of the stage currently running.
    index: usize,
    last: Option<T>,
    failure: Option<Option<T>>,
    /// In-flight stage promise.
    current: Option<Promise<T>>,
    lazy: bool,
    started: bool,
}

impl<T> Driver<T> {
    fn discard(&mut self) {
        self.stages.clear();
        self.current = None;
        self.last = None;
    }
}

type SharedDriver<T> = Rc<RefCell<Driver<T>>>;

/// A promise driven by a sequence of stages. See [`chain`].
pub struct Pipeline<T> {
    promise: Promise<T>,
    driver: SharedDriver<T>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            driver: Rc::clone(&self.driver),
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("promise", &self.promise)
            .finish_non_exhaustive()
    }
}

/// Build a pipeline over `stages`. Nothing runs until [`Pipeline::start`].
///
/// An empty pipeline is resolved on construction.
pub fn chain<T, I>(stages: I) -> Pipeline<T>
where
    T: Clone + 'static,
    I: IntoIterator,
    I::Item: Into<Stage<T>>,
{
    let stages: VecDeque<Stage<T>> = stages.into_iter().map(Into::into).collect();
    let empty = stages.is_empty();
    let promise = Promise::new();
    let driver = Rc::new(RefCell::new(Driver {
        stages,
        index: 0,
        last: None,
        failure: None,
        current: None,
        lazy: false,
        started: false,
    }));

    let teardown = Rc::clone(&driver);
    promise.before_cancel(move || {
        let current = {
            let mut driver = teardown.borrow_mut();
            let current = driver.current.take();
            driver.discard();
            current
        };
        current.map_or(Step::Ready(None), |stage| Step::Pending(stage.cancel()))
    });

    if empty {
        promise.resolve(None);
    }
    Pipeline { promise, driver }
}

impl<T: Clone + 'static> Pipeline<T> {
    /// Let failed stages defer the rejection until every stage has run.
    pub fn lazy(&self, enabled: bool) -> &Self {
        self.driver.borrow_mut().lazy = enabled;
        self
    }

    /// Run the first stage. Later calls, or calls on a completed pipeline,
    /// do nothing.
    pub fn start(&self) -> &Promise<T> {
        let first = {
            let mut driver = self.driver.borrow_mut();
            if driver.started || self.promise.is_completed() {
                return &self.promise;
            }
            driver.started = true;
            driver.stages.pop_front()
        };
        if let Some(stage) = first {
            run_stage(&self.promise, &self.driver, stage);
        }
        &self.promise
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

impl<T> Deref for Pipeline<T> {
    type Target = Promise<T>;

    fn deref(&self) -> &Self::Target {
        &self.promise
    }
}

impl<T> AsPromise<T> for Pipeline<T> {
    fn as_promise(&self) -> &Promise<T> {
        &self.promise
    }
}

fn run_stage<T: Clone + 'static>(all: &Promise<T>, driver: &SharedDriver<T>, stage: Stage<T>) {
    let (index, input) = {
        let mut driver = driver.borrow_mut();
        driver.current = None;
        (driver.index, driver.last.clone())
    };

    let outcome = match stage {
        Stage::Step(step) => Ok(step),
        Stage::Run(run) => run(all, input),
    };
    let step = match outcome {
        Ok(step) => step,
        Err(err) => {
            tracing::error!(step = index, "chain error in step {index}: {err:#}");
            stage_failed(all, driver, None);
            return;
        }
    };
    if all.is_completed() {
        return;
    }

    match step {
        Step::Pending(stage) => {
            driver.borrow_mut().current = Some(stage.clone());
            let relay = all.clone();
            stage.progress(move |progress| {
                relay.notify(progress.clone());
            });
            let (on_done, on_fail) = (Rc::clone(driver), Rc::clone(driver));
            let (all_done, all_fail) = (all.clone(), all.clone());
            stage.then(
                move |payload| stage_done(&all_done, &on_done, payload.cloned()),
                move |payload| stage_failed(&all_fail, &on_fail, payload.cloned()),
            );
        }
        Step::Ready(payload) => stage_done(all, driver, payload),
        Step::Failed => stage_failed(all, driver, None),
    }
}

fn stage_done<T: Clone + 'static>(all: &Promise<T>, driver: &SharedDriver<T>, payload: Option<T>) {
    if all.is_completed() {
        return;
    }
    let next = {
        let mut driver = driver.borrow_mut();
        driver.last = payload;
        driver.index += 1;
        driver.stages.pop_front()
    };
    advance(all, driver, next);
}

fn stage_failed<T: Clone + 'static>(
    all: &Promise<T>,
    driver: &SharedDriver<T>,
    payload: Option<T>,
) {
    if all.is_completed() {
        return;
    }
    let next = {
        let mut driver = driver.borrow_mut();
        if driver.lazy {
            if driver.failure.is_none() {
                driver.failure = Some(payload);
            }
            driver.index += 1;
            Ok(driver.stages.pop_front())
        } else {
            driver.discard();
            Err(payload)
        }
    };
    match next {
        Ok(next) => advance(all, driver, next),
        Err(payload) => {
            all.reject(payload);
        }
    }
}

fn advance<T: Clone + 'static>(
    all: &Promise<T>,
    driver: &SharedDriver<T>,
    next: Option<Stage<T>>,
) {
    if let Some(stage) = next {
        run_stage(all, driver, stage);
        return;
    }
    let (failure, last) = {
        let mut driver = driver.borrow_mut();
        driver.current = None;
        (driver.failure.take(), driver.last.take())
    };
    match failure {
        Some(payload) => {
            all.reject(payload);
        }
        None => {
            all.resolve(last);
        }
    }
}

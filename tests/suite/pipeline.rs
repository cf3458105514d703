//! Sequential pipelines across crates.

use std::rc::Rc;
use std::time::Duration;

use tokio::task::LocalSet;
use vow_core::{Promise, Stage, Step, chain};
use vow_timers::{Timed, settled, timer};
use vow_types::{Progress, Settlement};

use crate::common::{log, record_progress};

#[test]
fn payloads_thread_through_stages_until_one_fails() {
    let calls = log();
    let inner: Promise<i32> = Promise::new();

    let (c1, c2, c3) = (Rc::clone(&calls), Rc::clone(&calls), Rc::clone(&calls));
    let next = inner.clone();
    let pipeline = chain([
        Stage::run(move |input| {
            c1.borrow_mut().push(("s1", input));
            Ok(Step::value(10))
        }),
        Stage::run(move |input| {
            c2.borrow_mut().push(("s2", input));
            Ok(Step::Pending(next))
        }),
        Stage::run(move |input| {
            c3.borrow_mut().push(("s3", input));
            Ok(Step::check(false))
        }),
    ]);

    assert!(calls.borrow().is_empty());
    pipeline.start();
    assert_eq!(*calls.borrow(), vec![("s1", None), ("s2", Some(10))]);

    inner.resolve(20);
    assert!(pipeline.is_rejected());
    assert_eq!(
        *calls.borrow(),
        vec![("s1", None), ("s2", Some(10)), ("s3", Some(20))]
    );

    pipeline.start();
    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn lazy_pipeline_runs_every_stage_then_rejects_with_first_failure() {
    let seen = log();
    let sink = Rc::clone(&seen);
    let pipeline = chain([
        Stage::from(Step::value(1)),
        Stage::run(|_| Ok(Step::Pending(Step::Failed.into_promise()))),
        Stage::run(move |input| {
            sink.borrow_mut().push(input);
            Ok(Step::value(3))
        }),
    ]);
    pipeline.lazy(true).start();

    assert_eq!(*seen.borrow(), vec![Some(1)]);
    assert!(pipeline.is_rejected());
    assert_eq!(pipeline.payload(), None);
}

#[test]
fn lazy_pipeline_relays_progress_from_stages_after_a_failure() {
    let failed: Promise<i32> = Promise::new();
    failed.reject(7);
    let later: Promise<i32> = Promise::new();
    let pipeline = chain([failed, later.clone()]);
    let seen = record_progress(&pipeline);
    pipeline.lazy(true).start();

    assert!(!pipeline.is_completed());
    later.notify(Progress::Percent(40));
    later.notify(Progress::Percent(80));
    assert_eq!(
        *seen.borrow(),
        vec![Progress::Percent(40), Progress::Percent(80)]
    );

    later.resolve(9);
    assert!(pipeline.is_rejected());
    assert_eq!(pipeline.payload(), Some(7));
}

#[tokio::test(start_paused = true)]
async fn timed_stages_relay_progress_to_the_pipeline() {
    LocalSet::new()
        .run_until(async {
            let pipeline = chain([
                Stage::run(|_| {
                    Ok(Step::Pending(timer(
                        Duration::from_millis(200),
                        Some("warm"),
                        Some(Duration::from_millis(100)),
                    )))
                }),
                Stage::run(|input| Ok(Step::Ready(input))),
            ]);
            let seen = record_progress(&pipeline);
            pipeline.start();

            assert_eq!(settled(&pipeline).await, Settlement::Resolved(Some("warm")));
            assert_eq!(
                *seen.borrow(),
                vec![Progress::Percent(50), Progress::Percent(100)]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn timeout_bounds_a_stalled_pipeline() {
    LocalSet::new()
        .run_until(async {
            let stalled: Promise<i32> = Promise::new();
            let pipeline = chain([stalled.clone()]);
            pipeline.timeout(Duration::from_millis(100));
            pipeline.start();

            assert_eq!(settled(&pipeline).await, Settlement::Rejected(None));
            assert!(!stalled.is_completed());
        })
        .await;
}

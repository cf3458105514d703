//! Timers, timeouts and delays on a paused clock.

use std::time::Duration;

use tokio::task::LocalSet;
use tokio::time::{Instant, sleep};
use vow_core::Promise;
use vow_timers::{Timed, settled, timer};
use vow_types::Settlement;

use crate::common::{percents, record_progress, record_resolution};

#[tokio::test(start_paused = true)]
async fn timer_reports_quarters_then_resolves() {
    LocalSet::new()
        .run_until(async {
            let started = Instant::now();
            let done = timer(
                Duration::from_millis(1000),
                Some("done"),
                Some(Duration::from_millis(250)),
            );
            let seen = record_progress(&done);
            let at = record_resolution(&done);

            assert_eq!(settled(&done).await, Settlement::Resolved(Some("done")));
            let resolved_at = (*at.borrow()).expect("resolution time");
            assert!(resolved_at - started >= Duration::from_millis(1000));

            let seen = percents(&seen);
            assert_eq!(&seen[..3], &[25, 50, 75]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn canceled_timer_stays_silent() {
    LocalSet::new()
        .run_until(async {
            let done = timer(
                Duration::from_millis(1000),
                Some("done"),
                Some(Duration::from_millis(250)),
            );
            let seen = record_progress(&done);

            sleep(Duration::from_millis(600)).await;
            done.cancel();
            let before = seen.borrow().len();

            sleep(Duration::from_millis(1000)).await;
            assert!(done.is_canceled());
            assert_eq!(done.payload(), None);
            assert_eq!(seen.borrow().len(), before);
            assert_eq!(percents(&seen), vec![25, 50]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn timeout_passes_fast_results_through() {
    LocalSet::new()
        .run_until(async {
            let fast = timer(Duration::from_millis(50), Some(5), None);
            fast.timeout(Duration::from_millis(100));

            assert_eq!(settled(&fast).await, Settlement::Resolved(Some(5)));
            sleep(Duration::from_millis(100)).await;
            assert!(fast.is_resolved());
            assert_eq!(fast.payload(), Some(5));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn timeout_rejects_at_the_limit() {
    LocalSet::new()
        .run_until(async {
            let started = Instant::now();
            let never: Promise<i32> = Promise::new();
            never.timeout(Duration::from_millis(100));

            assert_eq!(settled(&never).await, Settlement::Rejected(None));
            assert_eq!(started.elapsed(), Duration::from_millis(100));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn delay_waits_after_success() {
    LocalSet::new()
        .run_until(async {
            let started = Instant::now();
            let source = timer(Duration::from_millis(100), Some("v"), None);
            let delayed = source.delay(Duration::from_millis(300), None);

            assert_eq!(settled(&delayed).await, Settlement::Resolved(Some("v")));
            assert_eq!(started.elapsed(), Duration::from_millis(400));
        })
        .await;
}

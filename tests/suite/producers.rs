//! Producer-backed promises: custom producers and HTTP requests.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use tokio::task::LocalSet;
use vow_core::{Producer, Promise, extend, when};
use vow_http::{Client, RequestOptions, request};
use vow_timers::settled;
use vow_types::Settlement;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Settles on demand and counts releases.
struct Gate {
    promise: Option<Promise<u32>>,
    released: Rc<Cell<u32>>,
}

impl Producer<u32> for Gate {
    fn initialize(&mut self, promise: &Promise<u32>) {
        self.promise = Some(promise.clone());
    }

    fn release(&mut self) {
        self.promise = None;
        self.released.set(self.released.get() + 1);
    }
}

#[test]
fn producers_compose_with_join_and_release_once() {
    let released = Rc::new(Cell::new(0));
    let gate = extend::<u32, _>(Gate {
        promise: None,
        released: Rc::clone(&released),
    });
    let all = when([gate.promise().clone()]);

    let handle = gate.with_producer(|gate| gate.promise.clone());
    handle.expect("initialized").resolve(9);

    assert!(all.is_resolved());
    assert_eq!(released.get(), 1);
    gate.cancel();
    assert_eq!(released.get(), 1);
}

#[test]
fn canceling_a_join_releases_its_producers() {
    let released = Rc::new(Cell::new(0));
    let gate = extend::<u32, _>(Gate {
        promise: None,
        released: Rc::clone(&released),
    });
    let all = when([gate.promise().clone()]);

    all.cancel();
    assert!(gate.is_canceled());
    assert_eq!(released.get(), 1);
}

#[tokio::test]
async fn http_requests_join_like_any_other_promise() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/defects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"open": 3})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    LocalSet::new()
        .run_until(async {
            let client = Client::new();
            let defects = request(
                &client,
                format!("{}/defects", server.uri()),
                RequestOptions::default(),
            );
            let missing = request(
                &client,
                format!("{}/missing", server.uri()),
                RequestOptions::default(),
            );

            let strict = when([defects.promise().clone(), missing.promise().clone()]);
            let lenient = when([
                Promise::lenient(defects.promise().clone()),
                Promise::lenient(missing.promise().clone()),
            ]);

            let Settlement::Rejected(Some(error)) = settled(&strict).await else {
                panic!("strict join should reject with the request error");
            };
            assert_eq!(error["status"], 404);
            assert_eq!(settled(&lenient).await, Settlement::Resolved(None));
            assert_eq!(defects.payload(), Some(json!({"open": 3})));
        })
        .await;
}

//! The bootstrap pipeline: optional start delay, parallel fetch, bind.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{Value, json};
use vow_config::VowConfig;
use vow_core::{Pipeline, Promise, Stage, Step, chain, when};
use vow_http::{Client, RequestOptions, request};
use vow_timers::{Timed, settled, timer};
use vow_types::{Progress, Settlement, State};

/// How one bootstrap URL completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub url: String,
    pub state: State,
    pub payload: Option<Value>,
}

impl Fetched {
    pub fn to_json(&self) -> Value {
        json!({
            "url": self.url,
            "state": self.state,
            "payload": self.payload,
        })
    }
}

type Records = Rc<RefCell<Vec<Fetched>>>;

#[derive(Debug)]
pub struct Bootstrap {
    pub client: Client,
    pub urls: Vec<String>,
    pub options: RequestOptions,
    pub timeout: Duration,
    pub delay: Option<Duration>,
    pub refresh: Option<Duration>,
}

fn request_options(config: Option<&VowConfig>) -> RequestOptions {
    let mut options = RequestOptions::default();
    let Some(http) = config.and_then(|config| config.http.as_ref()) else {
        return options;
    };
    if let Some(content_type) = &http.content_type {
        options.content_type = Some(content_type.clone());
    }
    options.accept.clone_from(&http.accept);
    for (name, value) in &http.headers {
        options = options.header(name.clone(), Some(value.clone()));
    }
    options
}

impl Bootstrap {
    pub fn from_config(client: Client, urls: Vec<String>, config: Option<&VowConfig>) -> Self {
        Self {
            client,
            urls,
            options: request_options(config),
            timeout: config.map_or(Duration::from_secs(10), VowConfig::bootstrap_timeout),
            delay: config.and_then(VowConfig::bootstrap_delay),
            refresh: config.and_then(VowConfig::refresh),
        }
    }

    /// Build and start the pipeline. `report` is called once per URL from
    /// the bind stage, in URL completion order.
    pub fn start(self, mut report: impl FnMut(&Fetched) + 'static) -> Pipeline<Value> {
        let records: Records = Rc::new(RefCell::new(Vec::new()));
        let mut stages: Vec<Stage<Value>> = Vec::with_capacity(3);

        if let Some(delay) = self.delay {
            let refresh = self.refresh;
            stages.push(Stage::run(move |_| {
                Ok(Step::Pending(timer(delay, None, refresh)))
            }));
        }

        let sink = Rc::clone(&records);
        let Self {
            client,
            urls,
            options,
            ..
        } = self;
        stages.push(Stage::run(move |_| {
            tracing::info!(count = urls.len(), "fetching bootstrap data");
            Ok(Step::Pending(fetch_all(&client, &urls, &options, &sink)))
        }));

        stages.push(Stage::run(move |_| {
            for fetched in records.borrow().iter() {
                if fetched.state == State::Resolved {
                    tracing::info!(url = %fetched.url, "bound");
                } else {
                    tracing::warn!(
                        url = %fetched.url,
                        state = %fetched.state,
                        "fetch did not succeed"
                    );
                }
                report(fetched);
            }
            Ok(Step::empty())
        }));

        let pipeline = chain(stages);
        pipeline.progress(|progress: &Progress| {
            tracing::debug!(%progress, "bootstrap progress");
        });
        pipeline.timeout(self.timeout);
        pipeline.start();
        pipeline
    }

    pub async fn run(self, report: impl FnMut(&Fetched) + 'static) -> Settlement<Value> {
        let pipeline = self.start(report);
        settled(&pipeline).await
    }
}

/// Join every request; a failed request does not fail the join.
fn fetch_all(
    client: &Client,
    urls: &[String],
    options: &RequestOptions,
    records: &Records,
) -> Promise<Value> {
    when(urls.iter().map(|url| {
        let fetch = request(client, url.clone(), options.clone());
        let wrapper = Promise::lenient(fetch.promise().clone());

        // Registered after the wrapper so the record exists before the join
        // sees this request settle.
        let sink = Rc::clone(records);
        let observed = fetch.promise().clone();
        let url = url.clone();
        fetch.ever(move |payload| {
            sink.borrow_mut().push(Fetched {
                url,
                state: observed.state(),
                payload: payload.cloned(),
            });
        });
        wrapper
    }))
}

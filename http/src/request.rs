use std::collections::BTreeMap;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::task::{AbortHandle, spawn_local};
use vow_core::{Extended, Producer, Promise};
use vow_types::Progress;

const JSON_MEDIA_TYPE: &str = "application/json";

fn is_json(content_type: &str) -> bool {
    content_type.starts_with(JSON_MEDIA_TYPE)
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("HTTP {status}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl RequestError {
    /// The JSON object a failed request rejects with.
    #[must_use]
    pub fn to_payload(&self, method: &Method, url: &str) -> Value {
        let mut payload = json!({
            "method": method.as_str(),
            "url": url,
            "message": self.to_string(),
        });
        if let RequestError::Status { status, body } = self {
            payload["status"] = json!(status.as_u16());
            payload["body"] = json!(body);
        }
        payload
    }
}

/// How to send a request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Serialized as JSON when the content type is JSON. Otherwise strings
    /// are sent as-is and other values in their JSON text form.
    pub body: Option<Value>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    /// Extra headers. `None` values are not sent.
    pub headers: BTreeMap<String, Option<String>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            content_type: Some(JSON_MEDIA_TYPE.to_string()),
            accept: None,
            headers: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.headers.insert(name.into(), value);
        self
    }

    fn encoded_body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        let bytes = match body {
            _ if self.content_type.as_deref().is_some_and(is_json) => serde_json::to_vec(body)?,
            Value::String(text) => text.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        };
        Ok(Some(bytes))
    }
}

/// Producer for one HTTP request. See [`request`].
#[derive(Debug)]
pub struct Request {
    client: Client,
    url: String,
    options: RequestOptions,
    task: Option<AbortHandle>,
}

impl Request {
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            client,
            url: url.into(),
            options,
            task: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True while the request task may still be running.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Producer<Value> for Request {
    fn initialize(&mut self, promise: &Promise<Value>) {
        let client = self.client.clone();
        let url = self.url.clone();
        let options = self.options.clone();
        let target = promise.clone();

        tracing::debug!(method = %options.method, %url, "request started");
        let task = spawn_local(async move {
            match perform(&client, &url, &options, &target).await {
                Ok(body) => {
                    tracing::debug!(method = %options.method, %url, "request succeeded");
                    target.resolve(body);
                }
                Err(err) => {
                    tracing::debug!(method = %options.method, %url, "request failed: {err}");
                    target.reject(err.to_payload(&options.method, &url));
                }
            }
        });
        self.task = Some(task.abort_handle());
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn perform(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    promise: &Promise<Value>,
) -> Result<Option<Value>, RequestError> {
    let mut builder = client.request(options.method.clone(), url);
    if let Some(content_type) = &options.content_type {
        builder = builder.header(CONTENT_TYPE, content_type.as_str());
    }
    if let Some(accept) = &options.accept {
        builder = builder.header(ACCEPT, accept.as_str());
    }
    for (name, value) in &options.headers {
        if let Some(value) = value {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if let Some(body) = options.encoded_body()? {
        builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let total = response.content_length();

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
        promise.notify(Progress::Transferred {
            loaded: body.len() as u64,
            total,
        });
    }

    if !status.is_success() {
        return Err(RequestError::Status {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    if body.is_empty() {
        return Ok(None);
    }
    if content_type.as_deref().is_some_and(is_json) {
        return Ok(Some(serde_json::from_slice(&body)?));
    }
    Ok(Some(Value::String(String::from_utf8_lossy(&body).into_owned())))
}

/// Start an HTTP request and return its promise.
///
/// The promise resolves with the response body for a 2xx status: parsed
/// JSON when the response declares `application/json`, a string otherwise,
/// and no payload when the body is empty. Any other status, a transport
/// error or an unparsable JSON body rejects with an error object carrying
/// `method`, `url` and `message` (plus `status` and `body` for HTTP errors).
///
/// Completing the promise by any other means aborts the request.
///
/// # Panics
///
/// Panics if called outside a `tokio::task::LocalSet`.
pub fn request(
    client: &Client,
    url: impl Into<String>,
    options: RequestOptions,
) -> Extended<Request, Value> {
    Extended::new(Request::new(client.clone(), url, options))
}

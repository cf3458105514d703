//! HTTP requests as vow promises.
//!
//! [`request`] starts a request immediately and returns an [`Extended`]
//! promise settled from the response. Bodies are reported as
//! [`Progress::Transferred`] while they stream in.
//!
//! Requests run as tasks on the current `tokio::task::LocalSet`.
//!
//! [`Extended`]: vow_core::Extended
//! [`Progress::Transferred`]: vow_types::Progress::Transferred

mod request;

pub use request::{Request, RequestError, RequestOptions, request};
pub use reqwest::{Client, Method};

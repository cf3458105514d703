//! Single-threaded promises for vow.
//!
//! A [`Promise`] is a single-assignment result with success, failure and
//! progress channels and cooperative cancellation. Everything here runs
//! synchronously inside the call that triggers it: settling a promise fires
//! its callbacks before `resolve` returns, and registering on a settled
//! promise fires immediately. Clocks and IO live in other crates and drive
//! promises from the outside.
//!
//! # Combinators
//!
//! - [`when`]: parallel join, settles once every operand has settled
//! - [`chain`]: sequential pipeline, started explicitly
//! - [`Promise::defer`], [`Promise::pipe`], [`Promise::lenient`]: derived promises
//! - [`extend`]: producer-backed promises for leaf operations

mod extend;
mod join;
mod pipeline;
mod promise;
mod step;
mod transform;

pub use extend::{Extended, Producer, extend};
pub use join::when;
pub use pipeline::{Pipeline, chain};
pub use promise::{AsPromise, Promise};
pub use step::{Operand, Stage, Step};

pub use vow_types::{Progress, Settlement, State};

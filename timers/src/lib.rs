//! Clock-driven promises for vow.
//!
//! [`vow_core`] promises never wait on anything by themselves; this crate
//! supplies the external time source. Timer tasks are spawned with
//! [`tokio::task::spawn_local`], so every function here must be called from
//! inside a [`tokio::task::LocalSet`] (or a task running on one).
//!
//! - [`timer`]: resolve after a wait, optionally reporting progress
//! - [`Timed::timeout`] / [`Timed::delay`]: time bounds on existing promises
//! - [`resolved`] / [`rejected`]: settle on a later scheduler turn
//! - [`settled`]: await a promise from async code

mod bridge;
mod timed;
mod timer;
mod wait;

pub use bridge::{rejected, resolved, settled};
pub use timed::Timed;
pub use timer::timer;
pub use wait::{TimerError, Wait};

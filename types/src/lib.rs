//! Core domain types for vow.
//!
//! This crate contains the pure state descriptions shared by every layer:
//! the lifecycle of a settlement cell, the progress notifications relayed
//! between promises, and the outcome observed by async callers.
//! No IO, no async.

mod progress;
pub use progress::Progress;

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle of a single settlement cell.
///
/// A cell starts [`State::Pending`] and enters exactly one terminal state.
/// Terminal states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Pending,
    Resolved,
    Rejected,
    Canceled,
}

impl State {
    #[must_use]
    pub const fn is_completed(self) -> bool {
        !matches!(self, State::Pending)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Resolved => "resolved",
            State::Rejected => "rejected",
            State::Canceled => "canceled",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Terminal outcome of a promise, as seen by a caller awaiting it.
///
/// Payloads are optional: a promise may settle without carrying a value
/// (a bare `reject()`, the resolution of a join), and cancellation never
/// carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T> {
    Resolved(Option<T>),
    Rejected(Option<T>),
    Canceled,
}

impl<T> Settlement<T> {
    #[must_use]
    pub const fn state(&self) -> State {
        match self {
            Settlement::Resolved(_) => State::Resolved,
            Settlement::Rejected(_) => State::Rejected,
            Settlement::Canceled => State::Canceled,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Settlement::Resolved(_))
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Settlement::Rejected(_))
    }

    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Settlement::Canceled)
    }

    /// The carried payload, whichever way the promise settled.
    #[must_use]
    pub fn into_payload(self) -> Option<T> {
        match self {
            Settlement::Resolved(payload) | Settlement::Rejected(payload) => payload,
            Settlement::Canceled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_open_state() {
        assert!(!State::Pending.is_completed());
        assert!(State::Resolved.is_completed());
        assert!(State::Rejected.is_completed());
        assert!(State::Canceled.is_completed());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&State::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
        let parsed: State = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, State::Rejected);
    }

    #[test]
    fn settlement_reports_state_and_payload() {
        let resolved = Settlement::Resolved(Some(3));
        assert_eq!(resolved.state(), State::Resolved);
        assert_eq!(resolved.into_payload(), Some(3));

        let canceled: Settlement<i32> = Settlement::Canceled;
        assert!(canceled.is_canceled());
        assert_eq!(canceled.into_payload(), None);
    }
}

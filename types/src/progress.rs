use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A non-terminal notification relayed to progress listeners.
///
/// Progress is independent of the settlement payload type so that it can be
/// relayed across every stage of a pipeline, whatever each stage produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Progress {
    /// Elapsed share of a bounded wait, floored, in `0..=100`.
    Percent(u8),
    /// Bytes received so far, with the expected total when known.
    Transferred { loaded: u64, total: Option<u64> },
    /// Free-form status line.
    Note(String),
}

impl Progress {
    /// Floored percentage of `whole` covered by `part`, clamped to 100.
    ///
    /// A zero-length `whole` counts as complete.
    #[must_use]
    pub fn percent_of(part: Duration, whole: Duration) -> Self {
        if whole.is_zero() {
            return Progress::Percent(100);
        }
        let percent = part.as_nanos().saturating_mul(100) / whole.as_nanos();
        Progress::Percent(percent.min(100) as u8)
    }

    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Progress::Note(text.into())
    }

    #[must_use]
    pub const fn as_percent(&self) -> Option<u8> {
        match self {
            Progress::Percent(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Percent(value) => write!(f, "{value}%"),
            Progress::Transferred {
                loaded,
                total: Some(total),
            } => write!(f, "{loaded}/{total} bytes"),
            Progress::Transferred {
                loaded,
                total: None,
            } => write!(f, "{loaded} bytes"),
            Progress::Note(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_floored() {
        let whole = Duration::from_millis(1000);
        assert_eq!(
            Progress::percent_of(Duration::from_millis(250), whole),
            Progress::Percent(25)
        );
        assert_eq!(
            Progress::percent_of(Duration::from_millis(333), Duration::from_millis(1000)),
            Progress::Percent(33)
        );
        assert_eq!(
            Progress::percent_of(Duration::from_millis(2), Duration::from_millis(3)),
            Progress::Percent(66)
        );
    }

    #[test]
    fn percent_clamps_at_one_hundred() {
        let whole = Duration::from_millis(300);
        assert_eq!(
            Progress::percent_of(Duration::from_millis(400), whole),
            Progress::Percent(100)
        );
        assert_eq!(
            Progress::percent_of(Duration::from_millis(5), Duration::ZERO),
            Progress::Percent(100)
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(Progress::Percent(50).to_string(), "50%");
        assert_eq!(
            Progress::Transferred {
                loaded: 10,
                total: Some(20)
            }
            .to_string(),
            "10/20 bytes"
        );
        assert_eq!(
            Progress::Transferred {
                loaded: 10,
                total: None
            }
            .to_string(),
            "10 bytes"
        );
        assert_eq!(Progress::note("booting").to_string(), "booting");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Progress::Percent(75)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "percent", "value": 75}));
    }
}

//! Error taxonomy shared by the matchers, the selectors and the shape
//! transfer engine.

use std::fmt;

/// Every way a resolution or shape transfer can fail.
///
/// Only [`ResolutionError::NoMatch`] is recoverable: the caller keeps the
/// node's previous layout and carries on. Everything else aborts the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    /// A matching stage eliminated every candidate.
    NoMatch(String),
    /// A dimension or score computation left the i64 range.
    Overflow(String),
    /// A format outside the known enumeration.
    InvalidFormat(String),
    /// An undefined data type.
    InvalidDataType(String),
    /// Kernel capability tables are inconsistent.
    ConfigError(String),
    /// Dimensions cannot be reconciled with a packing rule.
    InvalidShape(String),
}

impl ResolutionError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ResolutionError::NoMatch(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::NoMatch(_) => "no match",
            ResolutionError::Overflow(_) => "overflow",
            ResolutionError::InvalidFormat(_) => "invalid format",
            ResolutionError::InvalidDataType(_) => "invalid data type",
            ResolutionError::ConfigError(_) => "configuration error",
            ResolutionError::InvalidShape(_) => "invalid shape",
        }
    }

    fn detail(&self) -> &str {
        match self {
            ResolutionError::NoMatch(s)
            | ResolutionError::Overflow(s)
            | ResolutionError::InvalidFormat(s)
            | ResolutionError::InvalidDataType(s)
            | ResolutionError::ConfigError(s)
            | ResolutionError::InvalidShape(s) => s,
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.detail())
    }
}

impl std::error::Error for ResolutionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_match_is_recoverable() {
        assert!(ResolutionError::NoMatch("dtype".into()).is_recoverable());
        assert!(!ResolutionError::Overflow("2 * i64::MAX".into()).is_recoverable());
        assert!(!ResolutionError::ConfigError("len".into()).is_recoverable());
    }

    #[test]
    fn display_carries_kind_and_detail() {
        let e = ResolutionError::InvalidFormat("Unknown".into());
        assert_eq!(e.to_string(), "invalid format: Unknown");
    }

    #[test]
    fn converts_into_anyhow() {
        let e: anyhow::Error = ResolutionError::NoMatch("slot 0".into()).into();
        assert!(e.downcast_ref::<ResolutionError>().is_some_and(|e| e.is_recoverable()));
    }
}

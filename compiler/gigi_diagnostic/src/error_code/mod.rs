//! Diagnostic codes.

use std::fmt;

/// Codes for every diagnostic the lowering utilities post.
///
/// Format: a letter for the default severity, then four digits.
/// - W0xxx: representation-clause warnings
/// - E9xxx: internal consistency failures surfaced as diagnostics
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Size clause leaves bits of the object unused
    W0001,
    /// Component clause pads the component
    W0002,
    /// Internal consistency failure
    E9001,
}

impl ErrorCode {
    pub const ALL: &'static [ErrorCode] = &[ErrorCode::W0001, ErrorCode::W0002, ErrorCode::E9001];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::W0001 => "W0001",
            ErrorCode::W0002 => "W0002",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// One-line description for `--explain` style listings.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::W0001 => "bits of the object are unused",
            ErrorCode::W0002 => "component is padded",
            ErrorCode::E9001 => "internal consistency failure",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorCode::W0001 | ErrorCode::W0002)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a code string like `"W0001"`. Case-insensitive.
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}

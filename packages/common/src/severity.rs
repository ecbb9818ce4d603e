use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Coarse three-level urgency attached to every record.
///
/// Stored on the ledger as the integer level (`1..=3`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Minor issues such as lost items or noise complaints.
    #[default]
    Low = 1,
    /// Significant crimes like theft, fraud or robbery.
    Medium = 2,
    /// Life-threatening crimes.
    High = 3,
}

impl Severity {
    /// Integer level as committed to the ledger.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Parse a ledger level. Anything outside `1..=3` is rejected.
    pub fn from_level(level: u64) -> Option<Self> {
        match level {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    /// Interpret a client-supplied JSON value.
    ///
    /// Accepts an integer or a numeric string. Floats, booleans and
    /// out-of-range numbers yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(Self::from_level),
            Value::String(s) => s.trim().parse::<u64>().ok().and_then(Self::from_level),
            _ => None,
        }
    }

    /// Map a classifier priority label (`high`, `medium`, `low`).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Status shown for a record carrying this severity.
    pub fn status(self) -> RecordStatus {
        RecordStatus::for_level(self.level().into())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Error when parsing an invalid severity level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid severity '{invalid}'. Valid values: 1, 2, 3")]
pub struct ParseSeverityError {
    invalid: String,
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .and_then(Self::from_level)
            .ok_or_else(|| ParseSeverityError {
                invalid: s.to_string(),
            })
    }
}

/// Display status derived from severity at read time. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum RecordStatus {
    #[serde(rename = "FIR Registered")]
    Registered,
    #[serde(rename = "Under Investigation")]
    UnderInvestigation,
}

impl RecordStatus {
    /// Severity 3 and above is under investigation, everything else registered.
    pub fn for_level(level: u64) -> Self {
        if level >= Severity::High.level().into() {
            Self::UnderInvestigation
        } else {
            Self::Registered
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "FIR Registered",
            Self::UnderInvestigation => "Under Investigation",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::Record;

/// Which part of a record a search inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SearchField {
    /// Derived record number (`FIR2024000042`), wire name `fir`.
    #[serde(rename = "fir")]
    RecordNumber,
    /// Blob `phone` field.
    #[serde(rename = "phone")]
    Phone,
    /// Blob `email` field.
    #[serde(rename = "email")]
    Email,
    /// Blob `idNumber` field (government id of the complainant), wire name `id`.
    #[serde(rename = "id")]
    ExternalId,
}

impl SearchField {
    pub const ALL: &'static [SearchField] = &[
        Self::RecordNumber,
        Self::Phone,
        Self::Email,
        Self::ExternalId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordNumber => "fir",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::ExternalId => "id",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = InvalidCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| InvalidCriterion::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCriterion {
    #[error("Unknown search type '{0}'. Valid values: fir, phone, email, id")]
    UnknownField(String),
    #[error("Search value must not be empty")]
    EmptyValue,
    #[error("Phone search value must contain at least one digit")]
    NoDigits,
}

/// A validated `{field, value}` search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriterion {
    field: SearchField,
    /// Trimmed value as typed.
    value: String,
    /// Normalized needle: lowercase for text fields, digits only for phone.
    needle: String,
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

impl SearchCriterion {
    pub fn new(field: SearchField, value: &str) -> Result<Self, InvalidCriterion> {
        let value = value.trim();
        if value.is_empty() {
            return Err(InvalidCriterion::EmptyValue);
        }

        let needle = match field {
            SearchField::Phone => {
                let d = digits(value);
                if d.is_empty() {
                    return Err(InvalidCriterion::NoDigits);
                }
                d
            }
            _ => value.to_lowercase(),
        };

        Ok(Self {
            field,
            value: value.to_string(),
            needle,
        })
    }

    pub fn field(&self) -> SearchField {
        self.field
    }

    /// Test a merged record against this criterion.
    pub fn matches(&self, record: &Record) -> bool {
        match self.field {
            // A bare number is a ledger id; the year digits in the record
            // number must not make it match every record.
            SearchField::RecordNumber => match self.value.parse::<u64>() {
                Ok(id) => id == record.id(),
                Err(_) => record.record_number.to_lowercase().contains(&self.needle),
            },
            SearchField::Phone => record
                .detail_str("phone")
                .is_some_and(|phone| digits(phone).contains(&self.needle)),
            SearchField::Email => record
                .detail_str("email")
                .is_some_and(|email| email.to_lowercase().contains(&self.needle)),
            SearchField::ExternalId => record
                .detail_str("idNumber")
                .is_some_and(|id| id.to_lowercase().contains(&self.needle)),
        }
    }
}

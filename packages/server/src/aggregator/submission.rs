use common::Severity;
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "Untitled FIR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSubmission {
    #[error("FIR body must be a JSON object")]
    NotAnObject,
    #[error("An incident description is required (incidentDescription or description)")]
    MissingDescription,
}

/// A validated client submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    fields: Map<String, Value>,
    title: String,
    description: String,
    requested_severity: Option<Severity>,
}

fn text<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl Submission {
    pub fn parse(body: Value) -> Result<Self, InvalidSubmission> {
        let Value::Object(fields) = body else {
            return Err(InvalidSubmission::NotAnObject);
        };

        let description = text(&fields, "incidentDescription")
            .or_else(|| text(&fields, "description"))
            .ok_or(InvalidSubmission::MissingDescription)?
            .to_string();
        let title = text(&fields, "incidentType")
            .or_else(|| text(&fields, "title"))
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        let requested_severity = fields.get("severity").and_then(Severity::from_json);

        Ok(Self {
            fields,
            title,
            description,
            requested_severity,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Severity the client supplied, if it was a valid level.
    pub fn requested_severity(&self) -> Option<Severity> {
        self.requested_severity
    }

    /// Detail document to pin: every client field plus the resolved severity.
    pub fn document(&self, severity: Severity) -> Value {
        let mut doc = self.fields.clone();
        doc.insert("severity".into(), Value::from(severity.level()));
        Value::Object(doc)
    }
}

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Where the validated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Query,
    Path,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Query => "query",
            Location::Path => "path",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single violated field. `pointer` is a JSON pointer into the checked value
/// (`/age`, `/person/first_name`); the root value itself is `""`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field required")]
    MissingField { pointer: String },

    #[error("value is not a valid {expected}")]
    TypeMismatch {
        pointer: String,
        expected: &'static str,
    },

    #[error("{message}")]
    ConstraintViolation { pointer: String, message: String },

    #[error("value is not a valid enumeration member; permitted: {}", quoted(allowed))]
    InvalidEnumValue {
        pointer: String,
        allowed: &'static [&'static str],
    },
}

fn quoted(members: &[&str]) -> String {
    members
        .iter()
        .map(|m| format!("'{m}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl FieldError {
    pub fn pointer(&self) -> &str {
        match self {
            FieldError::MissingField { pointer }
            | FieldError::TypeMismatch { pointer, .. }
            | FieldError::ConstraintViolation { pointer, .. }
            | FieldError::InvalidEnumValue { pointer, .. } => pointer,
        }
    }

    /// Name of the violated field (last pointer segment).
    pub fn field(&self) -> &str {
        self.pointer().rsplit('/').next().unwrap_or_default()
    }

    /// Machine-readable code rendered into problem responses.
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::MissingField { .. } => "missing",
            FieldError::TypeMismatch { .. } => "type_mismatch",
            FieldError::ConstraintViolation { .. } => "constraint_violation",
            FieldError::InvalidEnumValue { .. } => "invalid_enum",
        }
    }
}

/// Every violation found in one pass over an input. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s) in {location}", errors.len())]
pub struct ValidationFailed {
    pub location: Location,
    pub errors: Vec<FieldError>,
}

impl ValidationFailed {
    pub fn new(location: Location, errors: Vec<FieldError>) -> Self {
        Self { location, errors }
    }

    pub fn single(location: Location, error: FieldError) -> Self {
        Self::new(location, vec![error])
    }

    /// First error reported for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field() == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_field_names() {
        let e = FieldError::ConstraintViolation {
            pointer: "/person/age".into(),
            message: "ensure this value is greater than 0".into(),
        };
        assert_eq!(e.code(), "constraint_violation");
        assert_eq!(e.field(), "age");
        assert_eq!(e.to_string(), "ensure this value is greater than 0");

        let e = FieldError::MissingField {
            pointer: "/email".into(),
        };
        assert_eq!(e.code(), "missing");
        assert_eq!(e.to_string(), "field required");
    }

    #[test]
    fn enum_message_lists_members() {
        let e = FieldError::InvalidEnumValue {
            pointer: "/hair_color".into(),
            allowed: &["white", "brown"],
        };
        assert_eq!(
            e.to_string(),
            "value is not a valid enumeration member; permitted: 'white', 'brown'"
        );
        assert_eq!(e.code(), "invalid_enum");
    }

    #[test]
    fn validation_failed_summary() {
        let err = ValidationFailed::new(
            Location::Query,
            vec![
                FieldError::MissingField {
                    pointer: "/age".into(),
                },
                FieldError::TypeMismatch {
                    pointer: "/name".into(),
                    expected: "string",
                },
            ],
        );
        assert_eq!(err.to_string(), "2 validation error(s) in query");
        assert!(err.for_field("name").is_some());
        assert!(err.for_field("unknown").is_none());
    }
}

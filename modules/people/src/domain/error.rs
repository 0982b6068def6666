use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Two records meant to be merged declare the same field.
    #[error("Field '{field}' is present in more than one merged record")]
    FieldCollision { field: String },
}

impl DomainError {
    pub fn field_collision(field: impl Into<String>) -> Self {
        Self::FieldCollision {
            field: field.into(),
        }
    }
}

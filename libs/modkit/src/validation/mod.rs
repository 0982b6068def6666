//! Declarative input validation.
//!
//! A [`Schema`] is data: a named list of [`FieldSpec`]s, optionally layered over a
//! base schema with [`Schema::extends`]. One checking routine serves request bodies,
//! query strings and path segments. Types that are built from checked input
//! implement [`Shape`] and are extracted with the `Validated*` extractors in
//! [`crate::api::extract`].

mod error;
mod field;
pub mod formats;
mod schema;

pub use error::{FieldError, Location, ValidationFailed};
pub use field::{Bound, FieldKind, FieldSpec};
pub use schema::{Record, Schema};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Failure to build a [`Shape`] from raw input.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error(transparent)]
    Invalid(#[from] ValidationFailed),

    /// The normalized record did not fit the Rust type. Indicates a schema/type mismatch.
    #[error("normalized {shape} record does not match its type: {source}")]
    Decode {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A typed record backed by a static [`Schema`].
pub trait Shape: DeserializeOwned {
    fn schema() -> &'static Schema;

    /// Check `input` and deserialize the normalized record.
    fn from_input(location: Location, input: &Value) -> Result<Self, ShapeError> {
        let schema = Self::schema();
        let record = schema.validate_at(location, input)?;
        serde_json::from_value(Value::Object(record)).map_err(|source| ShapeError::Decode {
            shape: schema.name(),
            source,
        })
    }
}

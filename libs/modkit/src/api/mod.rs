//! HTTP-facing building blocks: the type-state operation builder, RFC 9457
//! problem responses and validating extractors.

pub mod extract;
pub mod operation_builder;
pub mod problem;
pub mod response;

pub use extract::{ValidatedJson, ValidatedPath, ValidatedPathJson, ValidatedQuery};
pub use operation_builder::{
    ensure_schema, state, Missing, OpenApiRegistry, OperationBuilder, OperationSpec,
    ParamLocation, ParamSpec, Present, RequestBodySpec, ResponseSpec,
};

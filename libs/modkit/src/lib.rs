//! # ModKit
//!
//! Building blocks for a modular HTTP server:
//!
//! - **Contracts**: [`Module`], [`RestfulModule`], [`RestHostModule`], [`StatefulModule`]
//! - **Registry**: explicit registration, dependency ordering, phase execution
//! - **Runtime**: init → REST → start → wait for shutdown → stop
//! - **API**: type-state [`OperationBuilder`], RFC 9457 [`Problem`] responses and
//!   validating extractors backed by [`validation::Schema`]
//!
//! ```rust,ignore
//! let m = Arc::new(People::default());
//! let registry = ModuleRegistry::builder()
//!     .register(ModuleEntry::new("people", m.clone()).with_rest(m))
//!     .build()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod context;
pub mod contracts;
pub mod registry;
pub mod runtime;
pub mod validation;

pub use crate::contracts::*;
pub use api::extract::{ValidatedJson, ValidatedPath, ValidatedPathJson, ValidatedQuery};
pub use api::problem::{internal_error, Problem, ProblemResponse, ValidationError};
pub use api::{OpenApiRegistry, OperationBuilder};
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use registry::{ModuleEntry, ModuleRegistry, RegistryError};
pub use runtime::{run, RunOptions, ShutdownOptions};
pub use validation::{FieldError, FieldSpec, Location, Schema, Shape, ValidationFailed};

//! People module: schema-validated person, developer and location records.
//!
//! Every operation validates its input through the `Validated*` extractors before a
//! handler runs; the domain service only echoes or merges normalized records.

pub mod api;
pub mod config;
pub mod domain;
mod module;

pub use config::PeopleConfig;
pub use module::People;

//! Evaluates configuration modules in an isolated engine and renders their exported values
//! as stylesheet variables.
//!
//! The pipeline for one [`FileDescriptor`](config::FileDescriptor) is
//! [`transform`](transform::transform) → [`Sandbox::evaluate`](sandbox::Sandbox::evaluate) →
//! [`flatten`](flatten::flatten) → [`render`](template::render). [`api`] drives it for single
//! descriptors, batches and `sassify.toml` files.

pub mod api;
pub mod config;
pub mod errors;
pub mod flatten;
pub mod parser;
pub mod sandbox;
pub mod template;
pub mod transactions;
pub mod transform;
mod utils;
pub mod value;

pub use api::{build, process_all, process_file, BatchReport, FileReport, Outcome, SassifyError};
pub use config::{Config, FileDescriptor, SandboxLimits};

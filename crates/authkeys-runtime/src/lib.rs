//! authkeys-runtime
//!
//! Drives the registered providers for an identity ([`Pipeline`]) and the
//! configuration self-test ([`CheckRunner`]).

mod check;
mod pipeline;
mod registry;

pub use check::{CheckEntry, CheckReport, CheckRunner, validate_providers};
pub use pipeline::Pipeline;
pub use registry::ProviderRegistry;

//! Error types for the index provisioner repository.
//!
//! `EngineError` is what a `SearchEngineClient` reports; `ProvisionError` is the
//! caller-facing taxonomy produced by the provisioner and the service.

mod engine_error;
mod provision_error;

pub use engine_error::EngineError;
pub use provision_error::ProvisionError;

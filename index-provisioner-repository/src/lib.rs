//! # Index Provisioner Repository
//!
//! This crate provides the search engine capability trait, an OpenSearch
//! implementation, an in-memory mock engine, and the `IndexProvisioner` that
//! brings an index to its configured state before documents are written.
//!
//! The crate only emits `tracing` events and spans; installing a subscriber
//! is left to the application.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod locks;
pub mod mock;
pub mod opensearch;
pub mod provisioner;
pub mod schema;
pub mod service;
pub mod types;
pub mod utils;

pub use config::ProvisionerConfig;
pub use errors::{EngineError, ProvisionError};
pub use interfaces::{EngineHit, SearchEngineClient};
pub use locks::{IndexLease, IndexLocks};
pub use mock::{Fault, MockSearchEngine};
pub use opensearch::{OpenSearchConfig, OpenSearchEngine};
pub use provisioner::IndexProvisioner;
pub use schema::{FieldDefinition, FieldMapping, FieldType, NormalizerSpec, Schema, SubField};
pub use service::SearchIndexService;
pub use types::{EngineOperation, IndexHandle, IndexLifecycleState, IndexName};

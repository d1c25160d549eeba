//! Configuration and dependency initialization.

mod dependencies;
mod settings;

pub use dependencies::{wait_for_engine, ConnectionMode, Dependencies};
pub use settings::Settings;

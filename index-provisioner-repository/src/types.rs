//! Identifiers and lifecycle types for index provisioning.

use std::fmt;

use crate::errors::ProvisionError;

/// Characters the engine refuses in index names.
const FORBIDDEN_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Maximum length of an index name in bytes.
const MAX_INDEX_NAME_BYTES: usize = 255;

/// A validated index name.
///
/// Index names are unique within the engine namespace. Construction enforces
/// the engine's naming rules so that a bad name is rejected before any remote
/// call is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexName(String);

impl IndexName {
    /// Validate and wrap an index name.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexName)` - If the name is acceptable to the engine
    /// * `Err(ProvisionError::Validation)` - If the name is empty or malformed
    ///
    /// # Example
    ///
    /// ```
    /// use index_provisioner_repository::IndexName;
    ///
    /// assert!(IndexName::new("todos").is_ok());
    /// assert!(IndexName::new("Todos").is_err());
    /// ```
    pub fn new(name: impl Into<String>) -> Result<Self, ProvisionError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ProvisionError::validation("Index name cannot be empty"));
        }

        if name.len() > MAX_INDEX_NAME_BYTES {
            return Err(ProvisionError::validation(format!(
                "Index name exceeds {} bytes",
                MAX_INDEX_NAME_BYTES
            )));
        }

        if name == "." || name == ".." {
            return Err(ProvisionError::validation(format!(
                "Index name '{}' is reserved",
                name
            )));
        }

        if name.starts_with(['-', '_', '+']) {
            return Err(ProvisionError::validation(format!(
                "Index name '{}' cannot start with '-', '_' or '+'",
                name
            )));
        }

        if name.chars().any(|c| c.is_uppercase()) {
            return Err(ProvisionError::validation(format!(
                "Index name '{}' must be lowercase",
                name
            )));
        }

        if let Some(c) = name.chars().find(|c| FORBIDDEN_INDEX_CHARS.contains(c)) {
            return Err(ProvisionError::validation(format!(
                "Index name '{}' contains invalid character '{}'",
                name, c
            )));
        }

        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an index as seen by the engine.
///
/// Analysis settings can only change while `Closed`; mapping and document
/// operations need `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexLifecycleState {
    Absent,
    Open,
    Closed,
}

impl IndexLifecycleState {
    /// Returns the state name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexLifecycleState::Absent => "absent",
            IndexLifecycleState::Open => "open",
            IndexLifecycleState::Closed => "closed",
        }
    }
}

impl fmt::Display for IndexLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single remote operation against the engine.
///
/// Carried in errors so callers know which step of a sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOperation {
    Exists,
    Status,
    Create,
    Delete,
    Close,
    Open,
    PutSettings,
    PutMapping,
    IndexDocument,
    GetDocument,
    Search,
    Ping,
}

impl EngineOperation {
    /// Returns the operation name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineOperation::Exists => "exists",
            EngineOperation::Status => "status",
            EngineOperation::Create => "create",
            EngineOperation::Delete => "delete",
            EngineOperation::Close => "close",
            EngineOperation::Open => "open",
            EngineOperation::PutSettings => "put_settings",
            EngineOperation::PutMapping => "put_mapping",
            EngineOperation::IndexDocument => "index_document",
            EngineOperation::GetDocument => "get_document",
            EngineOperation::Search => "search",
            EngineOperation::Ping => "ping",
        }
    }
}

impl fmt::Display for EngineOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an index that has been provisioned by `EnsureIndex`.
///
/// Only the provisioner can create one, so holding a handle means the index
/// was brought to its configured, open state at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    name: IndexName,
}

impl IndexHandle {
    pub(crate) fn new(name: IndexName) -> Self {
        Self { name }
    }

    /// The name of the provisioned index.
    pub fn name(&self) -> &IndexName {
        &self.name
    }
}

//! Index schema types: normalizers and field mappings.
//!
//! A `Schema` is the desired configuration of an index. Its normalizers are
//! applied as analysis settings (closed index) before its mapping is applied
//! (open index), since mapping fields may reference the normalizers by name.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::ProvisionError;
use crate::types::IndexName;

/// The only normalizer type this crate configures.
pub const CUSTOM_NORMALIZER_TYPE: &str = "custom";

/// A custom normalizer definition.
///
/// Filter order is significant and is sent to the engine exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerSpec {
    /// Name the mapping uses to reference this normalizer.
    pub name: String,
    /// Character filters, applied in order.
    #[serde(default)]
    pub char_filters: Vec<String>,
    /// Token filters, applied in order.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl NormalizerSpec {
    /// Create an empty custom normalizer.
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            char_filters: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Create a custom normalizer with a single `lowercase` token filter.
    ///
    /// # Example
    ///
    /// ```
    /// use index_provisioner_repository::NormalizerSpec;
    ///
    /// let spec = NormalizerSpec::lowercase("lowercase_normalizer");
    /// assert_eq!(spec.filters, vec!["lowercase".to_string()]);
    /// assert!(spec.char_filters.is_empty());
    /// ```
    pub fn lowercase(name: impl Into<String>) -> Self {
        Self::custom(name).with_filter("lowercase")
    }

    /// Append a character filter.
    pub fn with_char_filter(mut self, filter: impl Into<String>) -> Self {
        self.char_filters.push(filter.into());
        self
    }

    /// Append a token filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// The normalizer type sent to the engine.
    pub fn normalizer_type(&self) -> &'static str {
        CUSTOM_NORMALIZER_TYPE
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        if self.name.trim().is_empty() {
            return Err(ProvisionError::validation("Normalizer name cannot be empty"));
        }

        if self
            .char_filters
            .iter()
            .chain(self.filters.iter())
            .any(|f| f.trim().is_empty())
        {
            return Err(ProvisionError::validation(format!(
                "Normalizer '{}' has an empty filter name",
                self.name
            )));
        }

        Ok(())
    }
}

/// Primary field types supported in mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Keyword,
    Text,
    Boolean,
    Integer,
    Long,
    Float,
    Date,
}

impl FieldType {
    /// Returns the type name as expected by the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Date => "date",
        }
    }
}

/// A named sub-field (multi-field) of a mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<String>,
}

impl SubField {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            normalizer: None,
        }
    }

    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }
}

/// Definition of a top-level mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<String>,
    /// Named sub-fields, e.g. `title.keyword`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, SubField>,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            normalizer: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }

    /// Add a named sub-field.
    pub fn with_sub_field(mut self, name: impl Into<String>, sub_field: SubField) -> Self {
        self.fields.insert(name.into(), sub_field);
        self
    }
}

/// Field name to field definition.
///
/// Serializes to the engine's `{"properties": {...}}` mapping body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub properties: BTreeMap<String, FieldDefinition>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn with_field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.properties.insert(name.into(), definition);
        self
    }

    /// Every normalizer reference in the mapping as `(field path, normalizer)`.
    ///
    /// Sub-fields are reported with their dotted path (`title.lowercase`).
    pub fn normalizer_references(&self) -> Vec<(String, &str)> {
        let mut references = Vec::new();
        for (name, definition) in &self.properties {
            if let Some(normalizer) = definition.normalizer.as_deref() {
                references.push((name.clone(), normalizer));
            }
            for (sub_name, sub_field) in &definition.fields {
                if let Some(normalizer) = sub_field.normalizer.as_deref() {
                    references.push((format!("{}.{}", name, sub_name), normalizer));
                }
            }
        }
        references
    }

    fn validate_field(
        path: &str,
        field_type: FieldType,
        analyzer: Option<&str>,
        normalizer: Option<&str>,
    ) -> Result<(), ProvisionError> {
        if path.is_empty() || path.ends_with('.') {
            return Err(ProvisionError::validation("Field names cannot be empty"));
        }
        if normalizer.is_some() && field_type != FieldType::Keyword {
            return Err(ProvisionError::validation(format!(
                "Field '{}' of type {} cannot use a normalizer",
                path,
                field_type.as_str()
            )));
        }
        if analyzer.is_some() && field_type != FieldType::Text {
            return Err(ProvisionError::validation(format!(
                "Field '{}' of type {} cannot use an analyzer",
                path,
                field_type.as_str()
            )));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        for (name, definition) in &self.properties {
            Self::validate_field(
                name,
                definition.field_type,
                definition.analyzer.as_deref(),
                definition.normalizer.as_deref(),
            )?;
            for (sub_name, sub_field) in &definition.fields {
                Self::validate_field(
                    &format!("{}.{}", name, sub_name),
                    sub_field.field_type,
                    sub_field.analyzer.as_deref(),
                    sub_field.normalizer.as_deref(),
                )?;
            }
        }
        Ok(())
    }
}

/// Desired configuration of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Normalizers to define, in order.
    #[serde(default)]
    pub normalizers: Vec<NormalizerSpec>,
    /// Field mapping, applied after the normalizers.
    #[serde(default)]
    pub mapping: FieldMapping,
}

impl Schema {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            normalizers: Vec::new(),
            mapping,
        }
    }

    /// Add a normalizer definition.
    pub fn with_normalizer(mut self, normalizer: NormalizerSpec) -> Self {
        self.normalizers.push(normalizer);
        self
    }

    /// Check that the schema is internally consistent.
    ///
    /// Normalizer names must be non-empty and unique, and every normalizer the
    /// mapping references must be declared here.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the schema can be applied as a whole
    /// * `Err(ProvisionError::UnknownNormalizer)` - If the mapping references an undeclared normalizer
    /// * `Err(ProvisionError::Validation)` - For any other inconsistency
    pub fn validate(&self, index: &IndexName) -> Result<(), ProvisionError> {
        let mut declared = HashSet::new();
        for normalizer in &self.normalizers {
            normalizer.validate()?;
            if !declared.insert(normalizer.name.as_str()) {
                return Err(ProvisionError::validation(format!(
                    "Normalizer '{}' is declared more than once",
                    normalizer.name
                )));
            }
        }

        self.mapping.validate()?;

        for (field, normalizer) in self.mapping.normalizer_references() {
            if !declared.contains(normalizer) {
                return Err(ProvisionError::unknown_normalizer(
                    index,
                    normalizer,
                    Some(field),
                ));
            }
        }

        Ok(())
    }
}

//! Index configuration for the todo search index.
//!
//! This module defines the normalizer and mapping used for todo documents.

use crate::schema::{FieldDefinition, FieldMapping, NormalizerSpec, Schema, SubField};

/// The default name of the todo index.
pub const TODOS_INDEX: &str = "todos";

/// The normalizer used by the `lowercase` keyword sub-fields.
pub const LOWERCASE_NORMALIZER: &str = "lowercase_normalizer";

/// Build a multi-language text field.
///
/// The field is analyzed as standard text, with sub-fields for exact matching
/// (`keyword`), case-insensitive exact matching (`lowercase`) and English and
/// German stemming (`en`, `de`).
fn multi_language_text() -> FieldDefinition {
    FieldDefinition::text()
        .with_sub_field("keyword", SubField::keyword())
        .with_sub_field(
            "lowercase",
            SubField::keyword().with_normalizer(LOWERCASE_NORMALIZER),
        )
        .with_sub_field("en", SubField::text().with_analyzer("english"))
        .with_sub_field("de", SubField::text().with_analyzer("german"))
}

/// Get the schema for the todo index.
///
/// # Fields
///
/// - **id**: keyword, for exact lookups
/// - **title**, **description**: text with `keyword`, `lowercase`, `en` and `de` sub-fields
/// - **done**: boolean
///
/// # Returns
///
/// A `Schema` declaring `lowercase_normalizer` and the todo mapping.
pub fn todos_schema() -> Schema {
    let mapping = FieldMapping::new()
        .with_field("id", FieldDefinition::keyword())
        .with_field("title", multi_language_text())
        .with_field("description", multi_language_text())
        .with_field("done", FieldDefinition::boolean());

    Schema::new(mapping).with_normalizer(NormalizerSpec::lowercase(LOWERCASE_NORMALIZER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexName;
    use serde_json::json;

    #[test]
    fn test_todos_schema_is_valid() {
        let schema = todos_schema();
        let index = IndexName::new(TODOS_INDEX).unwrap();
        assert!(schema.validate(&index).is_ok());
    }

    #[test]
    fn test_todos_mapping_body() {
        let value = serde_json::to_value(&todos_schema().mapping).unwrap();
        let properties = &value["properties"];

        assert_eq!(properties["id"], json!({ "type": "keyword" }));
        assert_eq!(properties["done"], json!({ "type": "boolean" }));

        for field in ["title", "description"] {
            assert_eq!(
                properties[field],
                json!({
                    "type": "text",
                    "fields": {
                        "de": { "type": "text", "analyzer": "german" },
                        "en": { "type": "text", "analyzer": "english" },
                        "keyword": { "type": "keyword" },
                        "lowercase": { "type": "keyword", "normalizer": "lowercase_normalizer" }
                    }
                }),
                "Unexpected mapping for '{}'",
                field
            );
        }
    }

    #[test]
    fn test_todos_normalizer() {
        let schema = todos_schema();
        assert_eq!(schema.normalizers, vec![NormalizerSpec::lowercase(LOWERCASE_NORMALIZER)]);
    }
}

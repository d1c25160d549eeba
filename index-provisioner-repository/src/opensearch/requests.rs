//! OpenSearch request bodies and response parsing.
//!
//! Kept free of I/O so the wire format can be tested without a cluster.

use serde_json::{json, Map, Value};

use crate::errors::EngineError;
use crate::interfaces::EngineHit;
use crate::schema::{FieldMapping, NormalizerSpec};
use crate::types::IndexLifecycleState;
use index_provisioner_shared::SearchQuery;

/// Build the `_settings` body that defines the given normalizers.
///
/// ```json
/// { "analysis": { "normalizer": { "<name>": { "type": "custom", "char_filter": [], "filter": ["lowercase"] } } } }
/// ```
pub fn settings_body(normalizers: &[NormalizerSpec]) -> Value {
    let mut definitions = Map::new();
    for normalizer in normalizers {
        definitions.insert(
            normalizer.name.clone(),
            json!({
                "type": normalizer.normalizer_type(),
                "char_filter": normalizer.char_filters,
                "filter": normalizer.filters,
            }),
        );
    }

    json!({
        "analysis": {
            "normalizer": definitions
        }
    })
}

/// Build the `_mapping` body for a field mapping.
pub fn mapping_body(mapping: &FieldMapping) -> Result<Value, EngineError> {
    serde_json::to_value(mapping).map_err(|e| EngineError::parse(e.to_string()))
}

/// Build the `_search` body for a query.
///
/// A single field uses a `match` query, several fields a `multi_match`, and no
/// fields a `multi_match` over the index default fields.
pub fn search_body(query: &SearchQuery) -> Value {
    let clause = match query.fields.as_slice() {
        [field] => json!({
            "match": {
                field.as_str(): { "query": query.query }
            }
        }),
        [] => json!({
            "multi_match": { "query": query.query }
        }),
        fields => json!({
            "multi_match": {
                "query": query.query,
                "fields": fields
            }
        }),
    };

    json!({
        "query": clause,
        "from": query.offset,
        "size": query.limit
    })
}

/// Map an OpenSearch error response to an `EngineError`.
///
/// Error responses look like
/// `{"error": {"type": "...", "reason": "...", "root_cause": [...]}, "status": 400}`.
pub fn error_from_body(status: u16, body: &str) -> EngineError {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => error_from_value(status, &value),
        Err(_) => EngineError::rejected(status, "unknown", body.trim()),
    }
}

fn error_from_value(status: u16, value: &Value) -> EngineError {
    let error = &value["error"];

    let (error_type, reason) = match error {
        Value::Object(_) => (
            error["type"].as_str().unwrap_or("unknown").to_string(),
            error["reason"].as_str().unwrap_or_default().to_string(),
        ),
        Value::String(reason) => ("unknown".to_string(), reason.clone()),
        _ => ("unknown".to_string(), value.to_string()),
    };

    let index = error["index"].as_str().unwrap_or_default().to_string();

    match error_type.as_str() {
        "index_not_found_exception" => EngineError::index_not_found(index),
        "resource_already_exists_exception" => EngineError::index_already_exists(index),
        "index_closed_exception" => EngineError::index_closed(index),
        _ => EngineError::rejected(status, error_type, reason),
    }
}

/// Parse the lifecycle state from a `_cat/indices?format=json` response.
pub fn parse_cat_status(body: &Value) -> Result<IndexLifecycleState, EngineError> {
    let entry = body
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| EngineError::parse("Empty _cat/indices response"))?;

    match entry["status"].as_str() {
        Some("open") => Ok(IndexLifecycleState::Open),
        Some("close") => Ok(IndexLifecycleState::Closed),
        other => Err(EngineError::parse(format!(
            "Unexpected index status: {:?}",
            other
        ))),
    }
}

/// Parse a document `GET` response.
///
/// A 404 without an `error` object means the document is missing, not the index.
pub fn parse_get_body(status: u16, body: &str) -> Result<Option<Value>, EngineError> {
    let value: Value = serde_json::from_str(body).map_err(|e| EngineError::parse(e.to_string()))?;

    if value.get("error").is_some() {
        return Err(error_from_value(status, &value));
    }

    if value["found"].as_bool() != Some(true) {
        return Ok(None);
    }

    value
        .get("_source")
        .cloned()
        .map(Some)
        .ok_or_else(|| EngineError::parse("Document response has no _source"))
}

/// Parse the hits of a `_search` response.
pub fn parse_hits(body: &Value) -> Result<Vec<EngineHit>, EngineError> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| EngineError::parse("Search response has no hits array"))?;

    hits.iter()
        .map(|hit| {
            let id = hit["_id"]
                .as_str()
                .ok_or_else(|| EngineError::parse("Search hit has no _id"))?;
            let source = hit
                .get("_source")
                .cloned()
                .ok_or_else(|| EngineError::parse(format!("Search hit {} has no _source", id)))?;

            Ok(EngineHit {
                id: id.to_string(),
                score: hit["_score"].as_f64().unwrap_or(0.0),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDefinition;

    #[test]
    fn test_settings_body() {
        let body = settings_body(&[NormalizerSpec::lowercase("lowercase_normalizer")]);

        assert_eq!(
            body,
            json!({
                "analysis": {
                    "normalizer": {
                        "lowercase_normalizer": {
                            "type": "custom",
                            "char_filter": [],
                            "filter": ["lowercase"]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_settings_body_preserves_filter_order() {
        let spec = NormalizerSpec::custom("n")
            .with_filter("asciifolding")
            .with_filter("lowercase");
        let body = settings_body(&[spec]);

        assert_eq!(
            body["analysis"]["normalizer"]["n"]["filter"],
            json!(["asciifolding", "lowercase"])
        );
    }

    #[test]
    fn test_mapping_body() {
        let mapping = FieldMapping::new().with_field("done", FieldDefinition::boolean());
        let body = mapping_body(&mapping).unwrap();
        assert_eq!(body, json!({ "properties": { "done": { "type": "boolean" } } }));
    }

    #[test]
    fn test_search_body_single_field() {
        let body = search_body(&SearchQuery::matching("title", "test"));

        assert_eq!(body["query"]["match"]["title"]["query"], "test");
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 20);
    }

    #[test]
    fn test_search_body_multiple_fields() {
        let query = SearchQuery::matching("title", "test")
            .with_field("description")
            .with_limit(5)
            .with_offset(10);
        let body = search_body(&query);

        assert_eq!(body["query"]["multi_match"]["query"], "test");
        assert_eq!(
            body["query"]["multi_match"]["fields"],
            json!(["title", "description"])
        );
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 5);
    }

    #[test]
    fn test_search_body_all_fields() {
        let body = search_body(&SearchQuery::all_fields("test"));
        assert!(body["query"]["multi_match"].get("fields").is_none());
    }

    #[test]
    fn test_error_from_body_known_types() {
        let body = r#"{"error":{"type":"resource_already_exists_exception","reason":"index [todos/abc] already exists","index":"todos"},"status":400}"#;
        assert_eq!(
            error_from_body(400, body),
            EngineError::index_already_exists("todos")
        );

        let body = r#"{"error":{"type":"index_not_found_exception","reason":"no such index [todos]","index":"todos"},"status":404}"#;
        assert_eq!(error_from_body(404, body), EngineError::index_not_found("todos"));

        let body = r#"{"error":{"type":"index_closed_exception","reason":"closed","index":"todos"},"status":400}"#;
        assert_eq!(error_from_body(400, body), EngineError::index_closed("todos"));
    }

    #[test]
    fn test_error_from_body_rejection() {
        let body = r#"{"error":{"type":"mapper_parsing_exception","reason":"normalizer [lowercase_normalizer] not found for field [lowercase]"},"status":400}"#;
        let err = error_from_body(400, body);

        assert_eq!(err.missing_normalizer(), Some("lowercase_normalizer"));
    }

    #[test]
    fn test_error_from_body_not_json() {
        assert_eq!(
            error_from_body(502, "Bad Gateway\n"),
            EngineError::rejected(502, "unknown", "Bad Gateway")
        );
    }

    #[test]
    fn test_parse_cat_status() {
        let open = json!([{ "health": "yellow", "status": "open", "index": "todos" }]);
        assert_eq!(parse_cat_status(&open).unwrap(), IndexLifecycleState::Open);

        let closed = json!([{ "health": null, "status": "close", "index": "todos" }]);
        assert_eq!(parse_cat_status(&closed).unwrap(), IndexLifecycleState::Closed);

        assert!(parse_cat_status(&json!([])).is_err());
        assert!(parse_cat_status(&json!([{ "status": "weird" }])).is_err());
    }

    #[test]
    fn test_parse_get_body() {
        let found = r#"{"_index":"todos","_id":"1","found":true,"_source":{"id":"1","done":true}}"#;
        assert_eq!(
            parse_get_body(200, found).unwrap(),
            Some(json!({ "id": "1", "done": true }))
        );

        let missing = r#"{"_index":"todos","_id":"2","found":false}"#;
        assert_eq!(parse_get_body(404, missing).unwrap(), None);

        let no_index = r#"{"error":{"type":"index_not_found_exception","reason":"no such index","index":"todos"},"status":404}"#;
        assert_eq!(
            parse_get_body(404, no_index).unwrap_err(),
            EngineError::index_not_found("todos")
        );
    }

    #[test]
    fn test_parse_hits() {
        let body = json!({
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    { "_id": "1", "_score": 1.5, "_source": { "title": "Test" } },
                    { "_id": "2", "_score": null, "_source": { "title": "Other" } }
                ]
            }
        });

        let hits = parse_hits(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].score, 1.5);
        assert_eq!(hits[1].score, 0.0);
        assert_eq!(hits[1].source["title"], "Other");
    }

    #[test]
    fn test_parse_hits_invalid() {
        assert!(parse_hits(&json!({})).is_err());
        assert!(parse_hits(&json!({ "hits": { "hits": [{ "_score": 1.0 }] } })).is_err());
    }
}

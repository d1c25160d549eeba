//! In-memory search engine for testing and local development.
//!
//! `MockSearchEngine` enforces the same lifecycle rules as a real engine, so
//! provisioning sequences that would be rejected by OpenSearch are rejected
//! here too:
//!
//! - analysis settings can only change on a closed index
//! - mappings and documents need an open index
//! - a mapping may only reference normalizers defined on the index
//! - an existing field cannot change type
//!
//! It records every call it receives and can fail or delay the next call of a
//! given operation, which makes partial failures reproducible.
//!
//! Unlike OpenSearch, indexing a document into a missing index does not
//! create it.
//!
//! # Example
//!
//! ```ignore
//! use index_provisioner_repository::{EngineOperation, Fault, MockSearchEngine};
//!
//! let engine = MockSearchEngine::new();
//! engine.inject_fault(EngineOperation::Open, Fault::transport("connection reset")).await;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::EngineError;
use crate::interfaces::{EngineHit, SearchEngineClient};
use crate::schema::{FieldDefinition, FieldMapping, FieldType, NormalizerSpec};
use crate::types::{EngineOperation, IndexLifecycleState};
use index_provisioner_shared::SearchQuery;

/// A failure to apply to the next call of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail with `EngineError::Transport` without touching any state.
    Transport(String),
    /// Sleep before executing the call normally.
    Delay(Duration),
}

impl Fault {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn delay(duration: Duration) -> Self {
        Self::Delay(duration)
    }
}

#[derive(Debug)]
struct MockIndex {
    closed: bool,
    normalizers: BTreeMap<String, NormalizerSpec>,
    properties: BTreeMap<String, FieldDefinition>,
    documents: BTreeMap<String, Value>,
}

impl MockIndex {
    fn new() -> Self {
        Self {
            closed: false,
            normalizers: BTreeMap::new(),
            properties: BTreeMap::new(),
            documents: BTreeMap::new(),
        }
    }

    fn state(&self) -> IndexLifecycleState {
        if self.closed {
            IndexLifecycleState::Closed
        } else {
            IndexLifecycleState::Open
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    indices: HashMap<String, MockIndex>,
    calls: Vec<EngineOperation>,
    faults: HashMap<EngineOperation, Fault>,
}

impl MockState {
    fn index(&self, name: &str) -> Result<&MockIndex, EngineError> {
        self.indices
            .get(name)
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    fn index_mut(&mut self, name: &str) -> Result<&mut MockIndex, EngineError> {
        self.indices
            .get_mut(name)
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    fn open_index(&self, name: &str) -> Result<&MockIndex, EngineError> {
        let index = self.index(name)?;
        if index.closed {
            return Err(EngineError::index_closed(name));
        }
        Ok(index)
    }

    fn open_index_mut(&mut self, name: &str) -> Result<&mut MockIndex, EngineError> {
        let index = self.index_mut(name)?;
        if index.closed {
            return Err(EngineError::index_closed(name));
        }
        Ok(index)
    }
}

/// In-memory implementation of `SearchEngineClient`.
#[derive(Debug, Default)]
pub struct MockSearchEngine {
    state: Mutex<MockState>,
}

impl MockSearchEngine {
    /// Create an engine with no indices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail or delay the next call of `operation`.
    ///
    /// A fault is consumed by the first matching call. Injecting a second
    /// fault for the same operation replaces the first.
    pub async fn inject_fault(&self, operation: EngineOperation, fault: Fault) {
        self.state.lock().await.faults.insert(operation, fault);
    }

    /// Every operation received so far, in order, including failed ones.
    pub async fn calls(&self) -> Vec<EngineOperation> {
        self.state.lock().await.calls.clone()
    }

    /// Forget the recorded calls.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Names of the normalizers defined on an index.
    pub async fn normalizers(&self, index: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.normalizers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The current mapping of an index, or `None` if it does not exist.
    pub async fn mapping(&self, index: &str) -> Option<FieldMapping> {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| FieldMapping {
                properties: i.properties.clone(),
            })
    }

    /// Number of documents stored in an index.
    pub async fn document_count(&self, index: &str) -> usize {
        self.state
            .lock()
            .await
            .indices
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }

    /// Record the call and apply any pending fault for it.
    async fn begin(&self, operation: EngineOperation) -> Result<(), EngineError> {
        let fault = {
            let mut state = self.state.lock().await;
            state.calls.push(operation);
            state.faults.remove(&operation)
        };

        match fault {
            Some(Fault::Transport(msg)) => Err(EngineError::transport(msg)),
            Some(Fault::Delay(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn check_mapping(index: &MockIndex, mapping: &FieldMapping) -> Result<(), EngineError> {
    for (field, normalizer) in mapping.normalizer_references() {
        if !index.normalizers.contains_key(normalizer) {
            let leaf = field.rsplit('.').next().unwrap_or(field.as_str());
            return Err(EngineError::rejected(
                400,
                "mapper_parsing_exception",
                format!("normalizer [{}] not found for field [{}]", normalizer, leaf),
            ));
        }
    }

    for (name, definition) in &mapping.properties {
        let Some(existing) = index.properties.get(name) else {
            continue;
        };
        check_parameters(
            name,
            (existing.field_type, &existing.analyzer, &existing.normalizer),
            (definition.field_type, &definition.analyzer, &definition.normalizer),
        )?;

        for (sub_name, sub_field) in &definition.fields {
            if let Some(current) = existing.fields.get(sub_name) {
                check_parameters(
                    &format!("{}.{}", name, sub_name),
                    (current.field_type, &current.analyzer, &current.normalizer),
                    (sub_field.field_type, &sub_field.analyzer, &sub_field.normalizer),
                )?;
            }
        }
    }

    Ok(())
}

type FieldParameters<'a> = (FieldType, &'a Option<String>, &'a Option<String>);

/// Reject any change to the type, analyzer or normalizer of a mapped field.
fn check_parameters(
    path: &str,
    (from_type, from_analyzer, from_normalizer): FieldParameters<'_>,
    (to_type, to_analyzer, to_normalizer): FieldParameters<'_>,
) -> Result<(), EngineError> {
    if from_type != to_type {
        return Err(EngineError::rejected(
            400,
            "illegal_argument_exception",
            format!(
                "mapper [{}] cannot be changed from type [{}] to [{}]",
                path,
                from_type.as_str(),
                to_type.as_str()
            ),
        ));
    }

    for (parameter, from, to) in [
        ("analyzer", from_analyzer, to_analyzer),
        ("normalizer", from_normalizer, to_normalizer),
    ] {
        if from != to {
            return Err(EngineError::rejected(
                400,
                "illegal_argument_exception",
                format!(
                    "Mapper for [{}] conflicts with existing mapper: Cannot update parameter [{}] from [{}] to [{}]",
                    path,
                    parameter,
                    from.as_deref().unwrap_or("default"),
                    to.as_deref().unwrap_or("default")
                ),
            ));
        }
    }

    Ok(())
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Count the query tokens found in the searched fields of a document.
///
/// Sub-field paths such as `title.en` search their parent field.
fn score(source: &Value, fields: &[String], terms: &HashSet<String>) -> f64 {
    let values: Vec<&Value> = if fields.is_empty() {
        source
            .as_object()
            .map(|o| o.values().collect())
            .unwrap_or_default()
    } else {
        fields
            .iter()
            .filter_map(|f| source.get(f.split('.').next().unwrap_or(f)))
            .collect()
    };

    let document_terms: HashSet<String> = values
        .into_iter()
        .filter_map(Value::as_str)
        .flat_map(tokenize)
        .collect();

    terms.intersection(&document_terms).count() as f64
}

#[async_trait]
impl SearchEngineClient for MockSearchEngine {
    async fn exists(&self, index: &str) -> Result<bool, EngineError> {
        self.begin(EngineOperation::Exists).await?;
        Ok(self.state.lock().await.indices.contains_key(index))
    }

    async fn status(&self, index: &str) -> Result<IndexLifecycleState, EngineError> {
        self.begin(EngineOperation::Status).await?;
        Ok(self
            .state
            .lock()
            .await
            .indices
            .get(index)
            .map(MockIndex::state)
            .unwrap_or(IndexLifecycleState::Absent))
    }

    async fn create(&self, index: &str) -> Result<(), EngineError> {
        self.begin(EngineOperation::Create).await?;
        let mut state = self.state.lock().await;
        if state.indices.contains_key(index) {
            return Err(EngineError::index_already_exists(index));
        }
        state.indices.insert(index.to_string(), MockIndex::new());
        Ok(())
    }

    async fn delete(&self, index: &str) -> Result<(), EngineError> {
        self.begin(EngineOperation::Delete).await?;
        self.state
            .lock()
            .await
            .indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| EngineError::index_not_found(index))
    }

    async fn close(&self, index: &str) -> Result<(), EngineError> {
        self.begin(EngineOperation::Close).await?;
        self.state.lock().await.index_mut(index)?.closed = true;
        Ok(())
    }

    async fn open(&self, index: &str) -> Result<(), EngineError> {
        self.begin(EngineOperation::Open).await?;
        self.state.lock().await.index_mut(index)?.closed = false;
        Ok(())
    }

    async fn put_settings(
        &self,
        index: &str,
        normalizers: &[NormalizerSpec],
    ) -> Result<(), EngineError> {
        self.begin(EngineOperation::PutSettings).await?;
        let mut state = self.state.lock().await;
        let target = state.index_mut(index)?;

        if !target.closed {
            return Err(EngineError::rejected(
                400,
                "illegal_argument_exception",
                format!(
                    "Can't update non dynamic settings [[index.analysis.normalizer]] for open indices [[{}]]",
                    index
                ),
            ));
        }

        for normalizer in normalizers {
            target
                .normalizers
                .insert(normalizer.name.clone(), normalizer.clone());
        }
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &FieldMapping) -> Result<(), EngineError> {
        self.begin(EngineOperation::PutMapping).await?;
        let mut state = self.state.lock().await;
        let target = state.open_index_mut(index)?;

        check_mapping(target, mapping)?;
        for (name, definition) in &mapping.properties {
            match target.properties.get_mut(name) {
                // existing sub-fields stay, new ones are added
                Some(existing) => existing.fields.extend(definition.fields.clone()),
                None => {
                    target.properties.insert(name.clone(), definition.clone());
                }
            }
        }
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
    ) -> Result<(), EngineError> {
        self.begin(EngineOperation::IndexDocument).await?;
        let mut state = self.state.lock().await;
        state
            .open_index_mut(index)?
            .documents
            .insert(id.to_string(), source.clone());
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, EngineError> {
        self.begin(EngineOperation::GetDocument).await?;
        let state = self.state.lock().await;
        Ok(state.open_index(index)?.documents.get(id).cloned())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<Vec<EngineHit>, EngineError> {
        self.begin(EngineOperation::Search).await?;
        let state = self.state.lock().await;
        let target = state.open_index(index)?;

        let terms: HashSet<String> = tokenize(&query.query).into_iter().collect();
        let mut hits: Vec<EngineHit> = target
            .documents
            .iter()
            .filter_map(|(id, source)| {
                let score = score(source, &query.fields, &terms);
                (score > 0.0).then(|| EngineHit {
                    id: id.clone(),
                    score,
                    source: source.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        Ok(hits
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn ping(&self) -> Result<bool, EngineError> {
        self.begin(EngineOperation::Ping).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SubField;
    use serde_json::json;

    async fn engine_with_index(name: &str) -> MockSearchEngine {
        let engine = MockSearchEngine::new();
        engine.create(name).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let engine = MockSearchEngine::new();
        assert!(!engine.exists("todos").await.unwrap());
        assert_eq!(engine.status("todos").await.unwrap(), IndexLifecycleState::Absent);

        engine.create("todos").await.unwrap();
        assert_eq!(engine.status("todos").await.unwrap(), IndexLifecycleState::Open);

        engine.close("todos").await.unwrap();
        assert_eq!(engine.status("todos").await.unwrap(), IndexLifecycleState::Closed);

        engine.open("todos").await.unwrap();
        engine.delete("todos").await.unwrap();
        assert!(!engine.exists("todos").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_and_delete_missing() {
        let engine = engine_with_index("todos").await;

        assert_eq!(
            engine.create("todos").await.unwrap_err(),
            EngineError::index_already_exists("todos")
        );
        assert_eq!(
            engine.delete("other").await.unwrap_err(),
            EngineError::index_not_found("other")
        );
    }

    #[tokio::test]
    async fn test_settings_require_closed_index() {
        let engine = engine_with_index("todos").await;
        let normalizers = [NormalizerSpec::lowercase("lowercase_normalizer")];

        let err = engine.put_settings("todos", &normalizers).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected { status: 400, .. }));

        engine.close("todos").await.unwrap();
        engine.put_settings("todos", &normalizers).await.unwrap();
        assert_eq!(engine.normalizers("todos").await, vec!["lowercase_normalizer"]);
    }

    #[tokio::test]
    async fn test_mapping_rules() {
        let engine = engine_with_index("todos").await;
        let mapping = FieldMapping::new().with_field(
            "title",
            FieldDefinition::text()
                .with_sub_field("lowercase", SubField::keyword().with_normalizer("lowercase_normalizer")),
        );

        let err = engine.put_mapping("todos", &mapping).await.unwrap_err();
        assert_eq!(err.missing_normalizer(), Some("lowercase_normalizer"));

        engine
            .put_mapping("todos", &FieldMapping::new().with_field("done", FieldDefinition::boolean()))
            .await
            .unwrap();
        let err = engine
            .put_mapping("todos", &FieldMapping::new().with_field("done", FieldDefinition::keyword()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Rejected { .. }));

        engine.close("todos").await.unwrap();
        assert_eq!(
            engine.put_mapping("todos", &FieldMapping::new()).await.unwrap_err(),
            EngineError::index_closed("todos")
        );
    }

    #[tokio::test]
    async fn test_mapping_rejects_sub_field_changes() {
        let engine = engine_with_index("todos").await;
        engine.close("todos").await.unwrap();
        engine
            .put_settings(
                "todos",
                &[NormalizerSpec::lowercase("lowercase_normalizer"), NormalizerSpec::lowercase("folded")],
            )
            .await
            .unwrap();
        engine.open("todos").await.unwrap();

        let title = |normalizer: &str| {
            FieldMapping::new().with_field(
                "title",
                FieldDefinition::text().with_sub_field("lowercase", SubField::keyword().with_normalizer(normalizer)),
            )
        };
        engine.put_mapping("todos", &title("lowercase_normalizer")).await.unwrap();

        let err = engine.put_mapping("todos", &title("folded")).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::rejected(
                400,
                "illegal_argument_exception",
                "Mapper for [title.lowercase] conflicts with existing mapper: \
                 Cannot update parameter [normalizer] from [lowercase_normalizer] to [folded]"
            )
        );

        let retyped = FieldMapping::new().with_field(
            "title",
            FieldDefinition::text().with_sub_field("lowercase", SubField::text()),
        );
        assert!(matches!(
            engine.put_mapping("todos", &retyped).await.unwrap_err(),
            EngineError::Rejected { .. }
        ));

        let analyzed = FieldMapping::new().with_field("title", FieldDefinition::text().with_analyzer("english"));
        assert!(matches!(
            engine.put_mapping("todos", &analyzed).await.unwrap_err(),
            EngineError::Rejected { .. }
        ));

        // adding a sub-field keeps the existing ones
        let extended = FieldMapping::new().with_field(
            "title",
            FieldDefinition::text().with_sub_field("raw", SubField::keyword()),
        );
        engine.put_mapping("todos", &extended).await.unwrap();
        let mapping = engine.mapping("todos").await.unwrap();
        assert_eq!(
            mapping.properties["title"].fields.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["lowercase", "raw"]
        );
    }

    #[tokio::test]
    async fn test_documents_and_search() {
        let engine = engine_with_index("todos").await;
        engine
            .index_document("todos", "1", &json!({ "title": "Test elasticsearch", "done": true }))
            .await
            .unwrap();
        engine
            .index_document("todos", "2", &json!({ "title": "Buy milk", "done": false }))
            .await
            .unwrap();
        engine
            .index_document("todos", "3", &json!({ "title": "test the TEST suite" }))
            .await
            .unwrap();

        assert_eq!(engine.document_count("todos").await, 3);
        assert_eq!(
            engine.get_document("todos", "2").await.unwrap(),
            Some(json!({ "title": "Buy milk", "done": false }))
        );
        assert_eq!(engine.get_document("todos", "9").await.unwrap(), None);

        let hits = engine
            .search("todos", &SearchQuery::matching("title", "test suite"))
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);

        let hits = engine
            .search("todos", &SearchQuery::matching("title.en", "test").with_offset(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }

    #[tokio::test]
    async fn test_documents_require_open_index() {
        let engine = engine_with_index("todos").await;
        engine.close("todos").await.unwrap();

        assert_eq!(
            engine.index_document("todos", "1", &json!({})).await.unwrap_err(),
            EngineError::index_closed("todos")
        );
        assert_eq!(
            engine.get_document("missing", "1").await.unwrap_err(),
            EngineError::index_not_found("missing")
        );
    }

    #[tokio::test]
    async fn test_fault_is_one_shot() {
        let engine = engine_with_index("todos").await;
        engine
            .inject_fault(EngineOperation::Close, Fault::transport("connection reset"))
            .await;

        assert_eq!(
            engine.close("todos").await.unwrap_err(),
            EngineError::transport("connection reset")
        );
        assert_eq!(engine.status("todos").await.unwrap(), IndexLifecycleState::Open);

        engine.close("todos").await.unwrap();
        assert_eq!(engine.status("todos").await.unwrap(), IndexLifecycleState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_fault() {
        let engine = MockSearchEngine::new();
        engine
            .inject_fault(EngineOperation::Ping, Fault::delay(Duration::from_secs(5)))
            .await;

        let started = tokio::time::Instant::now();
        assert!(engine.ping().await.unwrap());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let engine = MockSearchEngine::new();
        engine.exists("todos").await.unwrap();
        engine.create("todos").await.unwrap();
        let _ = engine.create("todos").await;

        assert_eq!(
            engine.calls().await,
            vec![
                EngineOperation::Exists,
                EngineOperation::Create,
                EngineOperation::Create
            ]
        );

        engine.clear_calls().await;
        assert!(engine.calls().await.is_empty());
    }
}

//! The todo flow: provision the index, store a todo, read it back, search it.

use tracing::{debug, info};

use crate::AppError;
use index_provisioner_repository::opensearch::todos_schema;
use index_provisioner_repository::{IndexLocks, IndexName, SearchIndexService};
use index_provisioner_shared::{SearchQuery, TodoDocument};

/// The field searched by the flow.
pub const SEARCH_FIELD: &str = "title";

/// The query text searched by the flow.
pub const SEARCH_TEXT: &str = "test";

/// What the flow stored, read back and found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub stored: TodoDocument,
    pub fetched: TodoDocument,
    pub matches: Vec<TodoDocument>,
}

/// The todo written by the flow.
pub fn sample_todo() -> TodoDocument {
    TodoDocument::new(
        "1",
        "Test elasticsearch",
        "Use new @nestjs/elasticsearch module and check if TypeScript type definitions are used correctly",
        true,
    )
}

/// Run the todo flow once against `index`.
///
/// # Arguments
///
/// * `service` - The search index service
/// * `locks` - Lease registry serialising provisioning of `index`
/// * `index` - The index to provision
/// * `reset` - Delete and recreate the index first
pub async fn run_todo_demo(
    service: &SearchIndexService,
    locks: &IndexLocks,
    index: IndexName,
    reset: bool,
) -> Result<DemoReport, AppError> {
    let handle = {
        let lease = locks.acquire(index).await;
        service.ensure_index(&lease, &todos_schema(), reset).await?
    };

    let todo = sample_todo();
    service.put(&handle, &todo).await?;
    info!(index = %handle.name(), doc_id = %todo.id, "Todo stored");

    let fetched: TodoDocument = service.get(&handle, &todo.id).await?;
    debug!(index = %handle.name(), todo = ?fetched, "Todo fetched");

    let matches: Vec<TodoDocument> = service
        .search(&handle, &SearchQuery::matching(SEARCH_FIELD, SEARCH_TEXT))
        .await?;
    info!(
        index = %handle.name(),
        field = SEARCH_FIELD,
        query = SEARCH_TEXT,
        matches = matches.len(),
        "Search completed"
    );

    Ok(DemoReport {
        stored: todo,
        fetched,
        matches,
    })
}

use chat_core::{ExecuteQueryContext, QueryHistory};
use tokio::sync::RwLock;

/// Current query context and the history of executed statements.
#[derive(Default)]
pub struct QueryService {
    context: RwLock<Option<ExecuteQueryContext>>,
    history: RwLock<Vec<QueryHistory>>,
}

impl QueryService {
    pub fn new(history: Vec<QueryHistory>, context: Option<ExecuteQueryContext>) -> Self {
        Self {
            context: RwLock::new(context),
            history: RwLock::new(history),
        }
    }

    pub async fn context(&self) -> Option<ExecuteQueryContext> {
        self.context.read().await.clone()
    }

    pub async fn set_context(&self, context: Option<ExecuteQueryContext>) {
        *self.context.write().await = context;
    }

    pub async fn history(&self) -> Vec<QueryHistory> {
        self.history.read().await.clone()
    }

    pub async fn record(&self, context: ExecuteQueryContext) -> QueryHistory {
        let entry = QueryHistory::new(context);
        self.history.write().await.push(entry.clone());
        entry
    }
}

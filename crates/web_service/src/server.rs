use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use chat_core::Config;
use db_connector::{ConnectorFactory, DefaultConnectorFactory};
use llm_relay::{OpenAIRelay, RelayConfig};
use log::{error, info};
use prompt_budget::{AssistantRegistry, SharedTokenCounter, TiktokenCounter};

use crate::controllers::{
    chat_controller, connection_controller, conversation_controller, meta_controller,
    query_controller,
};
use crate::error::Result;
use crate::middleware::TracingMiddleware;
use crate::services::{ConnectionService, ConversationService, QueryService};
use crate::storage::{FileSessionStorage, SessionSnapshot};

/// Everything a request handler may touch. Built once and shared through
/// `web::Data`.
pub struct AppState {
    pub config: Config,
    pub counter: SharedTokenCounter,
    pub assistants: AssistantRegistry,
    pub relay: OpenAIRelay,
    pub connectors: Arc<dyn ConnectorFactory>,
    pub connections: ConnectionService,
    pub conversations: ConversationService,
    pub queries: QueryService,
    pub storage: Option<FileSessionStorage>,
}

impl AppState {
    pub fn new(
        config: Config,
        counter: SharedTokenCounter,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        let relay = OpenAIRelay::new(RelayConfig::from(&config));
        Self {
            config,
            counter,
            assistants: AssistantRegistry::builtin(),
            relay,
            connectors,
            connections: ConnectionService::default(),
            conversations: ConversationService::default(),
            queries: QueryService::default(),
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: FileSessionStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Seed the stores from a rehydrated snapshot.
    pub fn restore(mut self, snapshot: SessionSnapshot) -> Self {
        self.connections = ConnectionService::new(snapshot.connections);
        self.conversations = ConversationService::new(snapshot.conversations, snapshot.messages);
        self.queries = QueryService::new(snapshot.query_history, snapshot.query_context);
        self
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connections: self.connections.list().await,
            conversations: self.conversations.list().await,
            messages: self.conversations.all_messages().await,
            query_history: self.queries.history().await,
            query_context: self.queries.context().await,
        }
    }

    /// Write the session to disk when persistence is enabled.
    pub async fn persist(&self) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.save_with(|| self.snapshot()).await?;
        }
        Ok(())
    }
}

const DEFAULT_WORKER_COUNT: usize = 10;

pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(meta_controller::config)
            .configure(chat_controller::config)
            .configure(connection_controller::config)
            .configure(conversation_controller::config)
            .configure(query_controller::config),
    );
}

/// Build the shared state: tokenizer, connector factory and, when enabled, the
/// persisted session.
pub async fn build_state(
    config: Config,
    data_dir: PathBuf,
) -> std::result::Result<AppState, String> {
    let counter: SharedTokenCounter = Arc::new(
        TiktokenCounter::new().map_err(|e| format!("Failed to initialize tokenizer: {e}"))?,
    );
    let use_database = config.use_database;
    let mut state = AppState::new(config, counter, Arc::new(DefaultConnectorFactory));

    if use_database {
        let storage = FileSessionStorage::new(&data_dir);
        match storage.load().await {
            Ok(Some(snapshot)) => state = state.restore(snapshot),
            Ok(None) => info!("No saved session in {}", data_dir.display()),
            Err(e) => return Err(format!("Failed to load session: {e}")),
        }
        state = state.with_storage(storage);
    }

    Ok(state)
}

pub async fn run(
    config: Config,
    data_dir: PathBuf,
    host: &str,
    port: u16,
) -> std::result::Result<(), String> {
    info!("Starting web service...");

    let app_state = web::Data::new(build_state(config, data_dir).await?);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingMiddleware)
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .workers(DEFAULT_WORKER_COUNT)
    .bind(format!("{host}:{port}"))
    .map_err(|e| format!("Failed to bind server: {e}"))?
    .run();

    info!("Starting web service on http://{host}:{port}");

    if let Err(e) = server.await {
        error!("Web server error: {}", e);
        return Err(format!("Web server error: {e}"));
    }

    Ok(())
}

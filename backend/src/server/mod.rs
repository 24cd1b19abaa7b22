//! Server construction: adapter selection, state wiring, and bootstrap.

pub mod config;

pub use config::{AppConfig, ConfigError};

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::{error, info, warn};

use crate::domain::ports::{
    AuthVerifier, ChangeRecorder, DocumentStore, SearchIndex, TasksCommand, TasksQuery, UpdateBus,
};
use crate::domain::{TASK_UPDATES_TOPIC, TaskSyncService, TokenVerifier};
use crate::inbound::http::health::{self as health, HealthState};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tasks;
use crate::inbound::ws;
use crate::inbound::ws::registry::{SessionRegistry, pump_updates};
use crate::inbound::ws::state::WsState;
use crate::outbound::memory::{
    MemoryChangeRecorder, MemoryDocumentStore, MemorySearchIndex, MemoryUpdateBus,
};
use crate::outbound::redis::{
    RedisChangeRecorder, RedisDocumentStore, RedisSearchIndex, RedisUpdateBus, connect,
};

/// The four infrastructure ports behind the task pipeline.
#[derive(Clone)]
pub struct Adapters {
    pub store: Arc<dyn DocumentStore>,
    pub index: Arc<dyn SearchIndex>,
    pub recorder: Arc<dyn ChangeRecorder>,
    pub bus: Arc<dyn UpdateBus>,
}

impl Adapters {
    /// In-process adapters: single-instance mode and tests.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryDocumentStore::new()),
            index: Arc::new(MemorySearchIndex::new()),
            recorder: Arc::new(MemoryChangeRecorder::new()),
            bus: Arc::new(MemoryUpdateBus::new()),
        }
    }

    /// Redis adapters sharing one connection pool.
    pub async fn redis(url: &str) -> std::io::Result<Self> {
        let pool = connect(url).await.map_err(std::io::Error::other)?;
        let bus = RedisUpdateBus::new(url, pool.clone()).map_err(std::io::Error::other)?;
        Ok(Self {
            store: Arc::new(RedisDocumentStore::new(pool.clone())),
            index: Arc::new(RedisSearchIndex::new(pool.clone())),
            recorder: Arc::new(RedisChangeRecorder::new(pool)),
            bus: Arc::new(bus),
        })
    }
}

/// Per-worker state bundles shared by the app factory.
#[derive(Clone)]
pub struct AppStates {
    pub http: HttpState,
    pub ws: WsState,
}

/// Wire services, the verifier, and the session registry over `adapters`,
/// and start this instance's bus dispatcher. The subscription is taken
/// before returning so no event published afterwards is missed locally.
pub async fn build_states(adapters: &Adapters, config: &AppConfig) -> AppStates {
    let service = Arc::new(
        TaskSyncService::new(
            adapters.store.clone(),
            adapters.index.clone(),
            adapters.recorder.clone(),
            adapters.bus.clone(),
        )
        .with_retention(config.task_retention),
    );
    let verifier: Arc<dyn AuthVerifier> =
        Arc::new(TokenVerifier::new(adapters.store.clone(), &config.jwt_secret));
    let registry = Arc::new(SessionRegistry::new());

    match adapters.bus.subscribe(TASK_UPDATES_TOPIC).await {
        Ok(updates) => {
            tokio::spawn(pump_updates(registry.clone(), updates));
        }
        Err(bus_error) => {
            error!(error = %bus_error, "update bus subscription failed; live sync disabled on this instance");
        }
    }

    let commands: Arc<dyn TasksCommand> = service.clone();
    let queries: Arc<dyn TasksQuery> = service;
    AppStates {
        http: HttpState::new(commands, queries, verifier.clone()),
        ws: WsState::new(verifier, registry, config.allowed_origins.clone()),
    }
}

/// Mount every route and its state on an app.
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    states: &AppStates,
    health_state: &web::Data<HealthState>,
) {
    cfg.app_data(web::Data::new(states.http.clone()))
        .app_data(web::Data::new(states.ws.clone()))
        .app_data(health_state.clone())
        .service(
            web::scope("/api")
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::update_task)
                .service(tasks::remove_task),
        )
        .service(ws::ws_entry)
        .service(health::ready)
        .service(health::live);
}

/// Bootstrap and run the server until shutdown.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let adapters = match &config.redis_url {
        Some(url) => {
            info!("connecting redis adapters");
            Adapters::redis(url).await?
        }
        None => {
            warn!("REDIS_URL is not set; running single-instance with in-memory adapters");
            Adapters::in_memory()
        }
    };

    adapters.index.ensure().await.map_err(std::io::Error::other)?;

    let states = build_states(&adapters, &config).await;
    let health_state = web::Data::new(HealthState::new());
    let server_health = health_state.clone();

    let server = HttpServer::new(move || {
        let states = states.clone();
        let health_state = server_health.clone();
        App::new().configure(move |cfg| configure_app(cfg, &states, &health_state))
    })
    .bind(config.bind_addr)?;

    health_state.mark_ready();
    info!(addr = %config.bind_addr, "listening");
    server.run().await
}

//! Sitewright Server
//!
//! Axum server exposing the command endpoint the editor UI talks to, plus
//! the onboarding pipeline routes and an SSE chat stream. The visual
//! editor itself is served elsewhere; this is the JSON surface only.

mod api;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use sitewright_core::capabilities::CapabilityRegistry;
use sitewright_core::command::CommandService;
use sitewright_core::memory::{MemoryRepository, SqliteMemoryRepository};
use sitewright_core::pipeline::PipelineOrchestrator;
use sitewright_core::providers::{ProviderRouter, RouterConfig};
use sitewright_core::state::SitewrightDb;

#[derive(Parser)]
#[command(name = "sitewright", about = "Sitewright command server")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 4200)]
    port: u16,
    /// Path to the SQLite database
    #[arg(long, default_value = ".sitewright/sitewright.db")]
    db: String,
}

/// Application state shared across handlers.
pub struct AppState {
    pub service: CommandService,
    pub router: Arc<ProviderRouter>,
    pub db: Arc<SitewrightDb>,
    pub repo: Arc<dyn MemoryRepository>,
    /// One orchestrator per onboarding session
    pub pipelines: RwLock<HashMap<String, Arc<Mutex<PipelineOrchestrator>>>>,
    /// Per-project command serialization: concurrent turns for the same
    /// project queue up instead of racing the site state
    pub project_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub async fn project_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.project_locks.lock().await;
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn pipeline(
        &self,
        session_id: &str,
        project_id: &str,
    ) -> Arc<Mutex<PipelineOrchestrator>> {
        {
            let pipelines = self.pipelines.read().await;
            if let Some(existing) = pipelines.get(session_id) {
                return existing.clone();
            }
        }
        let mut orchestrator =
            PipelineOrchestrator::new(session_id, project_id, self.repo.clone());
        // Resume where a previous connection left off, if anywhere
        let _ = orchestrator.load_from_session().await;
        let orchestrator = Arc::new(Mutex::new(orchestrator));
        self.pipelines
            .write()
            .await
            .insert(session_id.to_string(), orchestrator.clone());
        orchestrator
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewright_core=debug,sitewright_server=debug".into()),
        )
        .init();

    let args = Args::parse();

    let db = Arc::new(SitewrightDb::open_at(&args.db)?);
    let repo: Arc<dyn MemoryRepository> = Arc::new(SqliteMemoryRepository::new(db.clone()));
    let router = Arc::new(ProviderRouter::from_env(RouterConfig::default()));
    info!(providers = ?router.configured_providers(), "providers configured");

    let service = CommandService::new(
        CapabilityRegistry::builtin(),
        router.clone(),
        repo.clone(),
        db.clone(),
    );

    let state: SharedState = Arc::new(AppState {
        service,
        router,
        db,
        repo,
        pipelines: RwLock::new(HashMap::new()),
        project_locks: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .nest("/api", api::routes())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(%addr, "sitewright server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use weekboard_core::config::WeekboardConfig;
use weekboard_roster::RosterManager;
use weekboard_tasks::{ScheduleTaskManager, SqliteTaskStore};

mod app;
mod auth;
mod http;
mod ws;

/// Weekly schedule board server.
#[derive(Debug, Parser)]
#[command(name = "weekboard-gateway", version)]
struct Args {
    /// Config file (default: ~/.weekboard/weekboard.toml)
    #[arg(long, env = "WEEKBOARD_CONFIG")]
    config: Option<String>,

    /// Override gateway.bind
    #[arg(long)]
    bind: Option<String>,

    /// Override gateway.port
    #[arg(long)]
    port: Option<u16>,

    /// Insert the configured default roster before serving
    #[arg(long)]
    seed_roster: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "weekboard_gateway=info,weekboard_tasks=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();
    let mut config = WeekboardConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        WeekboardConfig::default()
    });
    if let Some(bind) = args.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    info!(environment = %config.environment, "configuration loaded");

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    {
        let db = rusqlite::Connection::open(&db_path)?;
        db.execute_batch("PRAGMA journal_mode=WAL;")?;
    }

    // each subsystem gets its own connection
    let store = SqliteTaskStore::new(
        rusqlite::Connection::open(&db_path)?,
        &config.tasks_collection(),
    )?;
    let roster = RosterManager::new(
        rusqlite::Connection::open(&db_path)?,
        &config.employees_collection(),
    )?;
    if args.seed_roster {
        let inserted = roster.seed_defaults(&config.roster.defaults)?;
        info!(inserted, "roster seeded");
    }
    if config.gateway.auth.password.is_none() {
        warn!("no gateway.auth.password set; board is open to anyone who can reach it");
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(
        config,
        ScheduleTaskManager::new(store),
        roster,
    ));
    let router = app::build_router(state);

    info!("weekboard gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("weekboard gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}

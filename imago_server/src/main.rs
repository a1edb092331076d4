//! Imago web server.
//!
//! Connects to PostgreSQL, applies migrations, wires the account, session,
//! password reset and gallery managers into the HTTP router and serves it.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use imago::db::{Database, InMemoryStore};
use imago_server::{
    api::{self, AppState, Repositories},
    config::ServerConfig,
    logging, metrics,
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the Imago web server

USAGE:
  imago_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Keep all data in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  SERVER_URL               Base URL used in password reset links
  SERVER_ENV               dev or prod (prod marks cookies Secure)
  DATABASE_URL             PostgreSQL connection string
  PASSWORD_PEPPER          Password hashing pepper (required)
  IMAGE_DIR                Directory for gallery images [default: images]
  METRICS_BIND             Prometheus exporter address (optional)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics exported on {}", addr);
    }

    let state = if args.in_memory {
        info!("Using in-memory storage; data is lost on exit");
        AppState::new(Repositories::in_memory(InMemoryStore::new()), &config)
    } else {
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to apply migrations")?;
        info!("Database connected and migrated");

        let repos = Repositories::postgres(db.pool().clone(), config.image_dir.clone());
        AppState::new(repos, &config).with_database(db)
    };

    let database = state.database.clone();
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

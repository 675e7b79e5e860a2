//! Front desk server binary.
//!
//! Starts the axum control surface with structured logging, database
//! initialization, provider wiring, and graceful shutdown on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;

use frontdesk_ledger::Ledger;
use frontdesk_server::{app, config, AppState};
use frontdesk_session::{SessionProviders, SessionRegistry};
use frontdesk_voice::{
    AvatarRenderer, BeyondPresenceAvatar, CartesiaTts, DeepgramStt, OpenAiLlm, RoomService,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FRONTDESK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Builds the provider clients every call session shares.
fn build_providers(config: &config::Config) -> SessionProviders {
    let http = reqwest::Client::new();

    let avatar: Option<Arc<dyn AvatarRenderer>> = if config.avatar.is_enabled() {
        Some(Arc::new(BeyondPresenceAvatar::new(
            http.clone(),
            config.avatar.clone(),
        )))
    } else {
        tracing::info!("avatar not configured, sessions run audio-only");
        None
    };

    SessionProviders {
        stt: Arc::new(DeepgramStt::new(http.clone(), config.stt.clone())),
        tts: Arc::new(CartesiaTts::new(http.clone(), config.tts.clone())),
        llm: Arc::new(OpenAiLlm::new(http, config.llm.clone())),
        avatar,
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration (the server cannot start without it)");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = frontdesk_db::create_pool(
        &config.database.path,
        frontdesk_db::DbSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )
    .expect("failed to create database pool (check database.path in config)");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            frontdesk_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Wire up providers
    let rooms = Arc::new(RoomService::new(config.room.clone()));
    if !rooms.is_enabled() {
        tracing::warn!("livekit credentials missing, join tokens will not mint");
    }
    for (provider, missing) in [
        ("deepgram", config.stt.api_key.is_empty()),
        ("cartesia", config.tts.api_key.is_empty()),
        ("openai", config.llm.api_key.is_empty()),
    ] {
        if missing {
            tracing::warn!(provider, "api key missing, live calls will degrade");
        }
    }

    let state = AppState {
        ledger: Ledger::new(pool),
        registry: SessionRegistry::new(),
        rooms,
        providers: build_providers(&config),
        hours: config.hours.clone(),
        rates: config.rates,
    };

    // Build application
    let app = app(state, &config.server);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting frontdesk server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address (is another process using this port?)");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("frontdesk server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}

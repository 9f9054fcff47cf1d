// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::routes;
use crate::interface_adapters::state::{
    AppState, InMemoryProfileStore, InMemoryRelicStore, SystemClock,
};
use crate::use_cases::{FixedIntervalSchedule, LobbyRegistry, RegistrySettings};

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    // The deadline sweeper drives every time-triggered transition: expired
    // rounds, raid auto-starts and the archival of finished lobbies.
    let sweeper_registry = state.registry.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config::SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper_registry.sweep().await;
        }
    });

    let app = routes::app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking.
    axum::serve(listener, app).await.inspect_err(|error| {
        tracing::error!(%error, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling.
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|error| {
            tracing::error!(%address, %error, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> AppState {
    let registry = LobbyRegistry::new(
        RegistrySettings {
            round_duration: config::round_duration(),
            lobby_grace: config::lobby_grace(),
        },
        Default::default(),
        Arc::new(SystemClock),
        Arc::new(FixedIntervalSchedule::new(config::raid_interval())),
        Arc::new(InMemoryRelicStore::default()),
        Arc::new(InMemoryProfileStore::default()),
    );

    AppState {
        registry: Arc::new(registry),
    }
}

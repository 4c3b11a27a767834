// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Kurukatsu local API server
//!
//! Serves the session and club-registration core to the frontend on a
//! loopback address.

use kurukatsu::{
    config::{Config, IdentityBackend, StoreBackend},
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{FirebaseAuth, IdentityService, MemoryIdentity},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        identity = ?config.identity_backend,
        store = ?config.store_backend,
        "Starting Kurukatsu API"
    );

    let db: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let identity: Arc<dyn IdentityService> = match config.identity_backend {
        IdentityBackend::Firebase => {
            let api_key = config.require_firebase_api_key()?.to_string();
            Arc::new(FirebaseAuth::new(
                api_key,
                config.auth_emulator_host.as_deref(),
            ))
        }
        IdentityBackend::Memory => {
            tracing::warn!("Using in-memory identity service; accounts are lost on exit");
            Arc::new(MemoryIdentity::new())
        }
    };

    // Build shared state and start mirroring the identity service
    let state = Arc::new(AppState::new(config.clone(), db, identity));
    state.session.subscribe(state.identity.as_ref())?;

    // Build router
    let app = kurukatsu::routes::create_router(state.clone());

    // Start server
    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.unsubscribe()?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kurukatsu=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

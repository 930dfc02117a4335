//! # kc-server
//!
//! Main Axum server for Keycloak Rust.
//!
//! This crate provides the HTTP server combining:
//! - Admin REST API endpoints (realms and authentication flows)
//! - Health check endpoints
//!
//! Storage is in memory. On startup the `master` realm is created with the
//! built-in authentication flows bound.
//!
//! ## Usage
//!
//! ```ignore
//! use kc_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use kc_model::Realm;
use kc_storage::RealmProvider;
use kc_storage_memory::InMemoryStorage;
use tokio::net::TcpListener;

/// Name of the realm created on startup.
pub const MASTER_REALM: &str = "master";

/// The Keycloak Rust server.
pub struct Server {
    config: ServerConfig,
    storage: Arc<InMemoryStorage>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// This creates the storage and seeds the `master` realm with its
    /// built-in flows.
    ///
    /// # Errors
    ///
    /// Returns an error if the master realm cannot be stored.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(InMemoryStorage::new());

        if !storage.exists_by_name(MASTER_REALM).await? {
            let master = kc_auth::add_default_flows(storage.as_ref(), Realm::new(MASTER_REALM)).await?;
            storage.create(&master).await?;
            tracing::info!(realm = MASTER_REALM, "master realm created with default flows");
        }

        Ok(Self { config, storage })
    }

    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or already in use.
    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        let addr: SocketAddr = self.config.bind_address().parse()?;
        Ok(TcpListener::bind(addr).await?)
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        tracing::info!("Server listening on http://{}", listener.local_addr()?);

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the storage backing the server.
    #[must_use]
    pub fn storage(&self) -> &Arc<InMemoryStorage> {
        &self.storage
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates the router without starting the server.
    ///
    /// This is useful for integration testing.
    pub fn router(&self) -> Router {
        let state = AppState::new(self.config.clone(), Arc::clone(&self.storage));
        create_router(state)
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

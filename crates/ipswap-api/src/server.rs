//! Main server implementation for the ipswap API

use crate::{
    api,
    azure::{AzureClientBuilder, CloudProvider},
    config::Config,
    error::{ApiError, Result},
    services::{Diagnostics, IpRotator, VmLocator},
};
use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Main server structure
pub struct Server {
    config: Arc<Config>,
    app: Router,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    pub rotator: Arc<IpRotator>,

    pub diagnostics: Arc<Diagnostics>,
}

impl AppState {
    /// Wire the services around a cloud provider
    pub fn new(config: Arc<Config>, provider: Arc<dyn CloudProvider>) -> Self {
        let locator = VmLocator::new(provider.clone(), config.access.clone());
        let rotator = IpRotator::new(provider.clone(), locator, config.rotation.clone())
            .with_lookup_timeout(config.request_timeout());
        let diagnostics = Diagnostics::new(
            provider,
            config.access.clone(),
            config.azure.subscription_id.clone(),
        );

        Self {
            config,
            rotator: Arc::new(rotator),
            diagnostics: Arc::new(diagnostics),
        }
    }
}

impl Server {
    /// Create a new server instance talking to Azure
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing ipswap API server");

        config.validate()?;
        let credentials = config.azure.credentials()?;

        if config.access.allowed_resource_groups.is_empty() {
            info!("All resource groups are allowed");
        } else {
            info!(
                "Restricting rotations to resource groups: {}",
                config.access.allowed_resource_groups.join(", ")
            );
        }

        let client = AzureClientBuilder::from_config(&config.azure, credentials).build()?;

        Ok(Self::with_provider(config, Arc::new(client)))
    }

    /// Create a server around any cloud provider
    pub fn with_provider(config: Config, provider: Arc<dyn CloudProvider>) -> Self {
        let config = Arc::new(config);
        let state = AppState::new(config.clone(), provider);
        let app = Self::build_router(state);

        Self { config, app }
    }

    /// Build the application router with all routes and middleware
    pub fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

        Router::new()
            .nest("/api", api::routes(state.clone()))
            .layer(middleware)
            .with_state(state)
    }

    /// The router, for driving the server without a socket
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Run the server until shutdown signal
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind_address;

        info!("Starting HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Failed to bind to address {addr}: {e}"),
            })?;

        info!("ipswap API listening on {}", addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Server error: {e}"),
            })?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}

//! HTTP server and routing.

use std::future::Future;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::state::HubState;
use crate::ws::channels::Channel;
use crate::ws::handler::{orders_handler, pnl_handler, ticks_handler};

/// Builds the router serving every streaming channel.
///
/// # Errors
///
/// Returns an error if an allowed origin is not a valid header value.
pub fn router(state: HubState) -> Result<Router, ConfigError> {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.origin_headers()?))
        .allow_methods([Method::GET]);

    let mut app = Router::new();
    for channel in Channel::ALL {
        app = match channel {
            Channel::Ticks => app.route(channel.path(), get(ticks_handler)),
            Channel::Orders => app.route(channel.path(), get(orders_handler)),
            Channel::Pnl => app.route(channel.path(), get(pnl_handler)),
        };
    }

    Ok(app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}

/// The streaming hub server.
#[derive(Debug, Clone)]
pub struct Server {
    state: HubState,
}

impl Server {
    /// Creates a server over the given state.
    #[must_use]
    pub fn new(state: HubState) -> Self {
        Self { state }
    }

    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> &HubState {
        &self.state
    }

    /// Binds the configured address and serves until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the address
    /// cannot be bound.
    pub async fn run(self) -> Result<(), ApiError> {
        self.state.config.validate()?;
        let listener = TcpListener::bind(self.state.config.bind_address()).await?;
        self.serve_with(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves, then stops the
    /// producers and drops every registered connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the router cannot
    /// be built or serving fails.
    pub async fn serve_with<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.state.config.validate()?;
        let app = router(self.state.clone())?;
        let addr = listener.local_addr()?;

        info!("Streaming hub listening on {}", addr);
        for channel in Channel::ALL {
            info!(channel = %channel, path = channel.path(), "channel ready");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.state.shutdown();
        info!(metrics = ?self.state.metrics.snapshot(), "server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down streaming hub");
}

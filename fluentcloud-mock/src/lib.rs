// Library entry point for the mock server and for tests that run it in-process

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lro;
pub mod routes;
pub mod services;
pub mod store;

pub use app::AppState;
pub use config::MockSettings;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Complete application: routes, CORS and state.
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state.clone())
        .layer(app::create_cors())
        .with_state(state)
}

/// A mock server running on a background task.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Endpoint for clients, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn subscription_id(&self) -> &str {
        &self.state.settings.subscription_id
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Binds `settings.bind_addr` and serves on a spawned task. Needs a running tokio runtime.
pub async fn spawn(settings: MockSettings) -> anyhow::Result<MockServer> {
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    let addr = listener.local_addr()?;
    let state = AppState::new(settings);
    let app = build_app(state.clone());
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("[mock] server stopped: {}", e);
        }
    });
    tracing::info!("[mock] listening on {}", addr);
    Ok(MockServer {
        addr,
        state,
        handle,
    })
}

/// Serves until the process is stopped.
pub async fn serve(settings: MockSettings) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(
        "[mock] listening on {} (subscription {}, {} polls per operation)",
        listener.local_addr()?,
        settings.subscription_id,
        settings.polls_to_complete
    );
    let app = build_app(AppState::new(settings));
    axum::serve(listener, app).await?;
    Ok(())
}

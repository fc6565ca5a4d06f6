//! HTTP API server for the talkback gateway

pub mod health;
pub mod process;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::pipeline::Pipeline;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// The turn pipeline behind `/api/process-audio`
    pub pipeline: Arc<Pipeline>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    pipeline: Arc<Pipeline>,
    port: u16,
    artifact_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(pipeline: Arc<Pipeline>, port: u16) -> Self {
        Self {
            pipeline,
            port,
            artifact_dir: None,
        }
    }

    /// Serve published reply audio from this directory (static storage only)
    #[must_use]
    pub fn artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.artifact_dir = dir;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        ApiServer {
            state: ApiState {
                pipeline: self.pipeline,
            },
            port: self.port,
            artifact_dir: self.artifact_dir,
        }
    }
}

/// The assembled API server
pub struct ApiServer {
    state: ApiState,
    port: u16,
    artifact_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api", process::router(self.state.clone()))
            .merge(health::router());

        // Serve published artifacts if the static storage strategy is active
        if let Some(artifact_dir) = &self.artifact_dir {
            router = router.nest_service(crate::publish::AUDIO_ROUTE, ServeDir::new(artifact_dir));
            tracing::info!(path = %artifact_dir.display(), "serving published audio");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

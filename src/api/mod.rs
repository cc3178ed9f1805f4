//! HTTP API server for the voice chat gateway

pub mod error;
pub mod health;
pub mod users;
pub mod websocket;

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_status::SetStatus;
use tower_http::trace::TraceLayer;

use crate::config::{Config, DEFAULT_CORS_ORIGIN};
use crate::db::{DbPool, UserRepo};
use crate::responder::Responder;
use crate::{Error, Result};

pub use error::{ApiError, ErrorBody};
pub use users::MessageBody;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub user_repo: UserRepo,
    pub responder: Responder,
}

impl ApiState {
    /// Create state over a database pool with the default responder
    #[must_use]
    pub fn new(db: DbPool) -> Self {
        let user_repo = UserRepo::new(db.clone());
        Self {
            db,
            user_repo,
            responder: Responder::default(),
        }
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    db: DbPool,
    port: u16,
    cors_origin: String,
    static_dir: Option<PathBuf>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(db: DbPool, port: u16) -> Self {
        Self {
            db,
            port,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            static_dir: None,
        }
    }

    /// Create a builder from loaded configuration
    #[must_use]
    pub fn from_config(db: DbPool, config: &Config) -> Self {
        Self::new(db, config.port)
            .cors_origin(config.cors_origin.clone())
            .static_dir(config.static_dir.clone())
    }

    /// Set the single origin allowed by CORS
    #[must_use]
    pub fn cors_origin(mut self, origin: String) -> Self {
        self.cors_origin = origin;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the API server
    ///
    /// # Errors
    ///
    /// Returns error if the CORS origin is not a valid header value
    pub fn build(self) -> Result<ApiServer> {
        let cors_origin = HeaderValue::from_str(&self.cors_origin)
            .map_err(|e| Error::Config(format!("invalid CORS origin {}: {e}", self.cors_origin)))?;

        let state = ApiState::new(self.db);

        Ok(ApiServer {
            state: Arc::new(state),
            port: self.port,
            cors_origin,
            static_dir: self.static_dir,
        })
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    cors_origin: HeaderValue,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(users::router(self.state.clone()))
            .merge(websocket::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback(move |request: Request| {
                static_or_not_found(serve_dir.clone(), request)
            });
            tracing::info!(path = %static_dir.display(), "serving static files");
        } else {
            router = router.fallback(not_found);
        }

        let cors = CorsLayer::new()
            .allow_origin(self.cors_origin.clone())
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]);

        router
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns error if the server fails while running
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        self.serve_with_shutdown(listener, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
        })
        .await
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Unknown `/api` paths stay JSON; everything else goes to the web UI
async fn static_or_not_found(serve_dir: ServeDir<SetStatus<ServeFile>>, request: Request) -> Response {
    if is_api_path(request.uri().path()) {
        return not_found().await.into_response();
    }
    match serve_dir.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Catch-all for handler panics
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

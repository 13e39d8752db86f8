//! ServerBuilder for fluent API to build HTTP servers

use super::handlers;
use super::router::{AppState, build_api_routes};
use crate::storage::InMemoryStore;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builder for the dyehouse HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_store(InMemoryStore::with_users(AppConfig::demo_users())?)
///     .with_cors()
///     .build()?;
/// ```
pub struct ServerBuilder {
    store: Option<InMemoryStore>,
    cors: bool,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            store: None,
            cors: false,
            custom_routes: Vec::new(),
        }
    }

    /// Set the backing store (required)
    pub fn with_store(mut self, store: InMemoryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Allow any origin, for a dashboard served from another host
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add routes outside `/api`
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("InMemoryStore is required. Call .with_store()"))?;

        let mut app = Router::new()
            .route("/health", get(handlers::health))
            .nest("/api", build_api_routes(AppState { store }));

        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        if self.cors {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Stops on SIGTERM or Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build()?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {}", e);
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
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        ServerBuilder::new()
            .with_store(InMemoryStore::new())
            .build()
            .unwrap()
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[test]
    fn test_build_requires_store() {
        let err = ServerBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("InMemoryStore is required"));
    }

    #[test]
    fn test_build_with_store() {
        assert!(
            ServerBuilder::new()
                .with_store(InMemoryStore::new())
                .with_cors()
                .with_custom_routes(Router::new())
                .build()
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_health_at_root_and_under_api() {
        assert_eq!(get_status(app(), "/health").await, StatusCode::OK);
        assert_eq!(get_status(app(), "/api/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_a_token() {
        assert_eq!(get_status(app(), "/api/orders").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        assert_eq!(get_status(app(), "/orders").await, StatusCode::NOT_FOUND);
    }
}

//! HTTP surface for the Salescope query pipeline.
//!
//! Exposes two endpoints: `POST /runQuery`, which runs the full
//! generate-execute pipeline and returns the canonical response shape, and
//! `GET /health`, which reports reachability of the execution collaborator.
//! A completed pipeline run is always a 200, including program-level
//! failures surfaced inside the result text; a 500 is reserved for
//! infrastructure failures where the pipeline could not complete.

use axum::extract::{Json as AxumJson, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{middleware, Router};
use salescope_core::{QueryHandler, QueryRequest, QueryResponse};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Configuration for the query server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Request timeout duration
    pub request_timeout: Duration,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().expect("valid default bind addr"),
            enable_cors: true,
            cors_origins: None,
            request_timeout: Duration::from_secs(300),
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared application state containing the pipeline and configuration.
pub struct AppState<T: QueryHandler> {
    pub handler: Arc<T>,
    pub config: ServerConfig,
}

impl<T: QueryHandler> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            config: self.config.clone(),
        }
    }
}

/// Handler for the /runQuery POST endpoint.
async fn run_query_handler<T: QueryHandler + 'static>(
    State(app_state): State<AppState<T>>,
    AxumJson(request): AxumJson<QueryRequest>,
) -> std::result::Result<Json<QueryResponse>, (StatusCode, Json<QueryResponse>)> {
    log::info!("Received query ({} bytes)", request.prompt.len());

    match app_state.handler.run_query(&request.prompt).await {
        Ok(response) => {
            log::info!(
                "Pipeline completed with exit code {:?}",
                response.exit_code
            );
            Ok(Json(response))
        }
        Err(failure) => {
            log::error!("Pipeline failed: {}", failure.error);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(failure.into_response()),
            ))
        }
    }
}

/// Handler for the /health GET endpoint. Pings the execution collaborator's
/// base endpoint.
async fn health_handler<T: QueryHandler + 'static>(
    State(app_state): State<AppState<T>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let ok = app_state.handler.ping().await;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(json!({
            "ok": ok,
            "timestamp": chrono::Utc::now(),
        })),
    )
}

/// The query server.
pub struct QueryServer<T: QueryHandler> {
    handler: Arc<T>,
    config: ServerConfig,
}

impl<T: QueryHandler + Send + Sync + 'static> QueryServer<T> {
    pub fn new(handler: T) -> Self {
        Self {
            handler: Arc::new(handler),
            config: ServerConfig::default(),
        }
    }

    pub fn with_config(handler: T, config: ServerConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            handler: self.handler.clone(),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/runQuery", post(run_query_handler::<T>))
            .route("/health", get(health_handler::<T>))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    log::info!("Request {} {} {}", request_id, method, uri);

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    log::info!("Response {} completed in {:?}", request_id, duration);

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<_>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => CorsLayer::permissive(),
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Start the server with graceful shutdown support.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.config.bind_addr, e))?;

        log::info!("Salescope server starting on {}", self.config.bind_addr);
        log::info!("Query endpoint: http://{}/runQuery", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        log::info!("Salescope server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use salescope_core::{PipelineError, PipelineFailure};
    use tower::ServiceExt; // for `oneshot`

    struct MockHandler {
        response: std::result::Result<QueryResponse, PipelineFailure>,
        reachable: bool,
    }

    #[async_trait]
    impl QueryHandler for MockHandler {
        async fn run_query(
            &self,
            _prompt: &str,
        ) -> std::result::Result<QueryResponse, PipelineFailure> {
            self.response.clone()
        }

        async fn ping(&self) -> bool {
            self.reachable
        }
    }

    fn request_body(prompt: &str) -> Body {
        Body::from(serde_json::to_vec(&json!({ "prompt": prompt })).unwrap())
    }

    #[tokio::test]
    async fn test_run_query_success_returns_200_with_canonical_shape() {
        let server = QueryServer::new(MockHandler {
            response: Ok(QueryResponse {
                result: "category  units_sold\n".to_string(),
                code: "print(df)".to_string(),
                exit_code: Some(0),
            }),
            reachable: true,
        });
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/runQuery")
                    .header("content-type", "application/json")
                    .body(request_body("total units sold per category"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["result"], "category  units_sold\n");
        assert_eq!(body["code"], "print(df)");
        assert_eq!(body["exitCode"], 0);
    }

    #[tokio::test]
    async fn test_run_query_program_failure_is_still_200() {
        let server = QueryServer::new(MockHandler {
            response: Ok(QueryResponse {
                result: "Error (exit code 1): Traceback ...".to_string(),
                code: "raise ValueError()".to_string(),
                exit_code: Some(1),
            }),
            reachable: true,
        });
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/runQuery")
                    .header("content-type", "application/json")
                    .body(request_body("break"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["result"]
            .as_str()
            .unwrap()
            .starts_with("Error (exit code 1): "));
        assert_eq!(body["exitCode"], 1);
    }

    #[tokio::test]
    async fn test_run_query_infrastructure_failure_is_500() {
        let server = QueryServer::new(MockHandler {
            response: Err(PipelineFailure {
                error: PipelineError::Provision("SANDBOX_API_KEY is not set".to_string()),
                code: "print('x')".to_string(),
            }),
            reachable: true,
        });
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/runQuery")
                    .header("content-type", "application/json")
                    .body(request_body("anything"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["result"].as_str().unwrap().starts_with("Error: "));
        assert_eq!(body["code"], "print('x')");
        assert!(body.get("exitCode").is_none());
    }

    #[tokio::test]
    async fn test_health_reachable() {
        let server = QueryServer::new(MockHandler {
            response: Ok(QueryResponse {
                result: String::new(),
                code: String::new(),
                exit_code: None,
            }),
            reachable: true,
        });
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_health_unreachable_is_500() {
        let server = QueryServer::new(MockHandler {
            response: Ok(QueryResponse {
                result: String::new(),
                code: String::new(),
                exit_code: None,
            }),
            reachable: false,
        });
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["ok"], false);
    }
}

mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::ratelimit::RateLimiter;
use crate::core::{database, middleware};
use crate::features::auth::ApiKeyService;
use crate::features::files::{routes as files_routes, FileService};
use crate::modules::storage::DiskStore;
use axum::{routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    // Startup failures are fatal; per-request failures never are
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Initialize blob store (creates the upload directory)
    let disk_store = Arc::new(
        DiskStore::new(&config.storage)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize upload storage: {}", e))?,
    );

    // Initialize services
    let api_key_service = Arc::new(ApiKeyService::new(pool.clone()));
    let file_service = Arc::new(FileService::new(pool.clone(), Arc::clone(&disk_store)));
    let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    tracing::info!(
        "Rate limiter initialized: {} requests per {}s window",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs
    );

    let app = build_router(
        api_key_service,
        file_service,
        disk_store,
        rate_limiter,
        config.app.cors_allowed_origins.clone(),
        SwaggerInfoModifier {
            title: config.swagger.title.clone(),
            version: config.swagger.version.clone(),
            description: config.swagger.description.clone(),
        },
    );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Health check endpoint (no auth required)
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

fn build_router(
    api_key_service: Arc<ApiKeyService>,
    file_service: Arc<FileService>,
    disk_store: Arc<DiskStore>,
    rate_limiter: Arc<RateLimiter>,
    cors_allowed_origins: Vec<String>,
    swagger_modifier: SwaggerInfoModifier,
) -> Router {
    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger =
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));

    // Protected routes (require a valid x-api-key)
    let protected_routes = files_routes::routes(file_service).route_layer(
        axum::middleware::from_fn_with_state(api_key_service, middleware::auth_middleware),
    );

    // Public routes: health check and the static upload mount
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(files_routes::public_routes(disk_store));

    Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::cors_layer(cors_allowed_origins))
        // Global rate limit, ahead of auth and handlers
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{RateLimitConfig, StorageConfig};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    /// Router over a lazy pool: nothing here may touch the database, which
    /// is exactly what the tests below assert.
    async fn test_server(rate_limit: RateLimitConfig) -> TestServer {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/filedock_test")
            .unwrap();

        let upload_dir = std::env::temp_dir().join(format!("filedock-router-{}", Uuid::new_v4()));
        let disk_store = Arc::new(
            DiskStore::new(&StorageConfig {
                upload_dir: upload_dir.to_string_lossy().into_owned(),
            })
            .await
            .unwrap(),
        );

        let app = build_router(
            Arc::new(ApiKeyService::new(pool.clone())),
            Arc::new(FileService::new(pool, Arc::clone(&disk_store))),
            disk_store,
            Arc::new(RateLimiter::new(&rate_limit)),
            vec!["*".to_string()],
            SwaggerInfoModifier {
                title: "Filedock API".to_string(),
                version: "0.1.0".to_string(),
                description: "test".to_string(),
            },
        );

        TestServer::new(app).unwrap()
    }

    fn default_rate_limit() -> RateLimitConfig {
        RateLimitConfig {
            max_requests: 100,
            window_secs: 900,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = test_server(default_rate_limit()).await;

        let response = server.get("/health").await;
        response.assert_status(StatusCode::OK);

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized_before_any_store_access() {
        let server = test_server(default_rate_limit()).await;

        for (method, path) in [("GET", "/api/files"), ("POST", "/api/upload")] {
            let response = match method {
                "GET" => server.get(path).await,
                _ => server.post(path).await,
            };
            response.assert_status(StatusCode::UNAUTHORIZED);

            let body: Value = response.json();
            assert_eq!(body["status"], false);
            assert_eq!(body["message"], "Missing x-api-key header");
        }
    }

    #[tokio::test]
    async fn test_unknown_upload_is_not_found() {
        let server = test_server(default_rate_limit()).await;

        let response = server.get("/uploads/no-such-file.pdf").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], "File not found");
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_excess_requests() {
        let server = test_server(RateLimitConfig {
            max_requests: 3,
            window_secs: 900,
        })
        .await;

        for _ in 0..3 {
            server.get("/health").await.assert_status(StatusCode::OK);
        }

        let response = server.get("/health").await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);

        let body: Value = response.json();
        assert_eq!(body["status"], false);
    }
}

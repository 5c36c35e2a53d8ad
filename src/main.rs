use advault_backend::api;
use advault_backend::api::payments::PaymentsState;
use advault_backend::api::webhooks::WebhookState;
use advault_backend::auth::IdentityVerifier;
use advault_backend::config::AppConfig;
use advault_backend::database::init_pool_from_config;
use advault_backend::database::profile_repository::ProfileRepository;
use advault_backend::database::transaction_repository::TransactionRepository;
use advault_backend::health::{HealthChecker, HealthStatus};
use advault_backend::logging::init_tracing;
use advault_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use advault_backend::payments::client::NowPaymentsClient;
use advault_backend::payments::gateway::PaymentGateway;
use advault_backend::services::payment_intent::PaymentIntentService;
use advault_backend::services::reconciliation::ReconciliationService;
use advault_backend::services::settlement::SettlementService;
use advault_backend::services::status_poll::StatusPollService;

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "🚀 Starting advault backend service"
    );

    info!("📊 Initializing database connection pool...");
    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;
    info!("✅ Database connection pool initialized");

    info!("💱 Initializing NOWPayments client...");
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(NowPaymentsClient::new(config.nowpayments.clone())?);
    if config.nowpayments.allow_unsigned_ipn {
        warn!("⚠️  Unsigned IPN callbacks are enabled; do not run this in production");
    }
    info!(
        base_url = %config.nowpayments.base_url,
        timeout_secs = config.nowpayments.request_timeout,
        "✅ NOWPayments client initialized"
    );

    let identity = Arc::new(IdentityVerifier::new(&config.identity)?);

    // Repositories and services
    let transactions = Arc::new(TransactionRepository::new(db_pool.clone()));
    let profiles = Arc::new(ProfileRepository::new(db_pool.clone()));
    let settlement = Arc::new(SettlementService::new(transactions.clone()));

    let intent = Arc::new(PaymentIntentService::new(
        gateway.clone(),
        transactions.clone(),
        profiles,
        config.server.ipn_callback_url(),
    ));
    let poll = Arc::new(StatusPollService::new(
        gateway.clone(),
        transactions.clone(),
        settlement.clone(),
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        settlement,
        transactions,
        config.nowpayments.ipn_secret.clone(),
        config.nowpayments.allow_unsigned_ipn,
    ));

    let health_checker = HealthChecker::new(db_pool.clone());

    info!("🛣️  Setting up application routes...");

    let payments_routes = Router::new()
        .route(
            "/nowpayments/create-payment",
            post(api::payments::create_payment),
        )
        .route("/nowpayments/currencies", get(api::payments::get_currencies))
        .route(
            "/nowpayments/payment-status",
            post(api::payments::payment_status),
        )
        .with_state(Arc::new(PaymentsState {
            identity,
            intent,
            poll,
        }));

    let webhook_routes = Router::new()
        .route("/nowpayments-webhook", post(api::webhooks::handle_webhook))
        .with_state(Arc::new(WebhookState { reconciliation }));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .with_state(health_checker)
        .merge(payments_routes)
        .merge(webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);
    info!("✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

// Handlers

async fn root() -> &'static str {
    "Welcome to the advault backend API"
}

async fn health(
    axum::extract::State(checker): axum::extract::State<HealthChecker>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    let health_status = checker.check_health().await;

    if health_status.is_healthy() {
        Ok(Json(health_status))
    } else {
        error!("❌ Health check failed - service unhealthy");
        Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    }
}

/// Readiness probe - checks if the service is ready to accept traffic
async fn readiness(
    state: axum::extract::State<HealthChecker>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    health(state).await
}

/// Liveness probe - checks if the service is alive (basic check)
async fn liveness() -> &'static str {
    "OK"
}

use asaas_reconciler::config::AppConfig;
use asaas_reconciler::service::audit::AuditRecorder;
use asaas_reconciler::service::reconciler::Reconciler;
use asaas_reconciler::service::webhook_service::WebhookService;
use asaas_reconciler::store::ledger::LedgerStore;
use asaas_reconciler::store::postgres::PgLedgerStore;
use asaas_reconciler::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore { pool: pool.clone() });
    let webhook_service = WebhookService {
        reconciler: Reconciler {
            store: store.clone(),
        },
        audit: AuditRecorder { store },
    };

    let state = AppState {
        webhook_service,
        pool,
    };

    let webhook_routes = Router::new()
        .route(
            "/webhooks/asaas",
            post(asaas_reconciler::http::handlers::webhooks::receive_asaas),
        )
        .layer(from_fn_with_state(
            cfg.webhook_token.clone(),
            asaas_reconciler::http::middleware::webhook_auth::require_access_token,
        ));

    let app = Router::new()
        .route("/health", get(asaas_reconciler::http::handlers::webhooks::health))
        .route("/ops/readiness", get(asaas_reconciler::http::handlers::ops::readiness))
        .route("/ops/liveness", get(asaas_reconciler::http::handlers::ops::liveness))
        .merge(webhook_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

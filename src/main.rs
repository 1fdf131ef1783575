use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use payments_dispatcher::config::{AppConfig, GatewayConfig};
use payments_dispatcher::dispatch::Dispatcher;
use payments_dispatcher::http::handlers::{ops, payments};
use payments_dispatcher::http::middleware::caller::{attach_caller, CallerDirectory};
use payments_dispatcher::http::middleware::rate_limit::{enforce, RateLimitState};
use payments_dispatcher::ledger::PgLedger;
use payments_dispatcher::notify::{drain_failures, AlertDispatcher, PoolNotifier, SideEffectWorker};
use payments_dispatcher::repo::audit_repo::AuditRepo;
use payments_dispatcher::repo::callers_repo::CallersRepo;
use payments_dispatcher::repo::transactions_repo::TransactionsRepo;
use payments_dispatcher::risk::{HttpRiskScorer, HttpScreener, NoScreening, RiskGate, RiskScorer, SanctionsScreener};
use payments_dispatcher::service::payment_service::PaymentService;
use payments_dispatcher::AppState;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SIDE_EFFECT_CAPACITY: usize = 1024;
const SIDE_EFFECT_IN_FLIGHT: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let gateway = Arc::new(GatewayConfig::from_app(&cfg));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let client = reqwest::Client::new();
    let ledger = Arc::new(PgLedger {
        audit_repo: AuditRepo { pool: pool.clone() },
        transactions_repo: TransactionsRepo { pool: pool.clone() },
    });

    let (side_effects, failures) = SideEffectWorker::spawn(
        AlertDispatcher {
            client: client.clone(),
            webhook_url: gateway.fraud_alert_webhook_url.clone(),
            token: gateway.internal_service_token.clone(),
        },
        PoolNotifier {
            client: client.clone(),
            base_url: gateway.pool_service_url.clone(),
            token: gateway.gateway_token.clone(),
            timeout: gateway.dispatch.notify_timeout,
        },
        SIDE_EFFECT_CAPACITY,
        SIDE_EFFECT_IN_FLIGHT,
    );
    tokio::spawn(drain_failures(failures));

    let screener: Arc<dyn SanctionsScreener> = match &cfg.screening_url {
        Some(url) => Arc::new(HttpScreener {
            client: client.clone(),
            url: url.clone(),
            token: gateway.internal_service_token.clone(),
            timeout: Duration::from_secs(5),
        }),
        None => {
            tracing::warn!("SCREENING_URL not set, sanctions screening disabled");
            Arc::new(NoScreening)
        }
    };
    let scorer = cfg.risk_scorer_url.as_ref().map(|url| {
        Arc::new(HttpRiskScorer {
            client: client.clone(),
            url: url.clone(),
            token: gateway.internal_service_token.clone(),
            timeout: Duration::from_secs(5),
        }) as Arc<dyn RiskScorer>
    });

    let payment_service = PaymentService {
        config: gateway.clone(),
        gate: RiskGate {
            config: gateway.clone(),
            ledger: ledger.clone(),
            screener,
            scorer,
            side_effects: side_effects.clone(),
        },
        dispatcher: Dispatcher {
            config: gateway.clone(),
            client,
            transactions: ledger.clone(),
            ledger,
        },
        side_effects,
    };

    let redis_client = redis::Client::open(cfg.redis_url.clone())?;
    let state = AppState {
        payment_service,
        pool: pool.clone(),
        redis_client: redis_client.clone(),
    };

    let directory: Arc<dyn CallerDirectory> = Arc::new(CallersRepo { pool });
    let payment_routes = Router::new()
        .route("/payments/initiate", post(payments::initiate))
        .route("/payments/confirm", post(payments::confirm))
        .route("/payments/cancel", post(payments::cancel))
        .layer(from_fn_with_state(
            RateLimitState {
                redis_client,
                max_per_minute: cfg.max_requests_per_minute,
            },
            enforce,
        ))
        .layer(from_fn_with_state(directory, attach_caller));

    let app = Router::new()
        .route("/health", get(payments::health))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .merge(payment_routes)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

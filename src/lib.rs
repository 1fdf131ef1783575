pub mod config;
pub mod currency;
pub mod dispatch;
pub mod domain {
    pub mod audit;
    pub mod caller;
    pub mod payment;
    pub mod transaction;
    pub mod verdict;
}
pub mod error;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
    }
    pub mod middleware {
        pub mod caller;
        pub mod rate_limit;
    }
}
pub mod ledger;
pub mod notify;
pub mod providers;
pub mod repo {
    pub mod audit_repo;
    pub mod callers_repo;
    pub mod transactions_repo;
}
pub mod risk;
pub mod service {
    pub mod payment_service;
}

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub pool: sqlx::PgPool,
    pub redis_client: redis::Client,
}

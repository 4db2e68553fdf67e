pub mod config;
pub mod decode;
pub mod domain {
    pub mod event;
    pub mod sale;
}
pub mod error;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod webhooks;
    }
    pub mod middleware {
        pub mod webhook_auth;
    }
}
pub mod service {
    pub mod audit;
    pub mod reconciler;
    pub mod webhook_service;
}
pub mod store {
    pub mod ledger;
    pub mod memory;
    pub mod postgres;
}

#[derive(Clone)]
pub struct AppState {
    pub webhook_service: service::webhook_service::WebhookService,
    pub pool: sqlx::PgPool,
}

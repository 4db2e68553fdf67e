use crate::store::ledger::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("sale not found: {0}")]
    SaleNotFound(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("concurrent update conflict persisted for sale {0}")]
    ConflictExhausted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

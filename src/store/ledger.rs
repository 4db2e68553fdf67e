use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::event::PaymentMethod;
use crate::domain::sale::{PaymentStatus, Sale};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("concurrent update conflict")]
    Conflict,

    #[error("ledger store unavailable: {0}")]
    Unavailable(anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub sale_id: String,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub external_id: String,
    pub customer_id: Option<String>,
    pub billing_type: Option<String>,
    pub source: String,
    pub status: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub event: String,
    pub sale_id: Option<String>,
    pub payment_id: Option<String>,
    pub customer_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub billing_type: Option<String>,
    pub status: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SaleMutation {
    pub sale_id: String,
    pub expected_version: i64,
    pub paid_minor: i64,
    pub payment_status: PaymentStatus,
    pub gateway_payment_id: String,
    pub gateway_customer_id: Option<String>,
    pub last_payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConfirmationCommit {
    pub sale: SaleMutation,
    pub record: PaymentRecord,
    pub audit: AuditEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Duplicate,
}

/// Storage consumed by the reconciliation engine. `commit_confirmation` is
/// the atomic unit: sale update, payment record and audit entry land
/// together or not at all, and the sale update is a compare-and-swap on the
/// sale's version.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_sale(&self, sale_id: &str) -> Result<Option<Sale>, StoreError>;

    async fn find_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    async fn commit_confirmation(
        &self,
        commit: &ConfirmationCommit,
    ) -> Result<CommitOutcome, StoreError>;

    async fn mark_overdue(
        &self,
        sale_id: &str,
        expected_version: i64,
        overdue_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}

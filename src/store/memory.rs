use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::sale::{PaymentStatus, Sale};
use crate::store::ledger::{
    AuditEntry, CommitOutcome, ConfirmationCommit, LedgerStore, PaymentRecord, StoreError,
};

/// In-memory ledger for tests and lightweight deployments. A single lock
/// over the whole state gives `commit_confirmation` the same all-or-nothing
/// behavior as the Postgres transaction.
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    sales: HashMap<String, Sale>,
    payments: Vec<PaymentRecord>,
    audit: Vec<AuditEntry>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_sale(&self, sale: Sale) {
        self.inner.lock().await.sales.insert(sale.id.clone(), sale);
    }

    pub async fn sale(&self, sale_id: &str) -> Option<Sale> {
        self.inner.lock().await.sales.get(sale_id).cloned()
    }

    pub async fn payment_records(&self) -> Vec<PaymentRecord> {
        self.inner.lock().await.payments.clone()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().await.audit.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_sale(&self, sale_id: &str) -> Result<Option<Sale>, StoreError> {
        Ok(self.inner.lock().await.sales.get(sale_id).cloned())
    }

    async fn find_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .payments
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn commit_confirmation(
        &self,
        commit: &ConfirmationCommit,
    ) -> Result<CommitOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner
            .payments
            .iter()
            .any(|p| p.external_id == commit.record.external_id)
        {
            return Ok(CommitOutcome::Duplicate);
        }

        let Some(sale) = inner.sales.get_mut(&commit.sale.sale_id) else {
            return Err(StoreError::Conflict);
        };
        if sale.version != commit.sale.expected_version {
            return Err(StoreError::Conflict);
        }

        sale.paid_minor = commit.sale.paid_minor;
        sale.payment_status = commit.sale.payment_status;
        sale.gateway_payment_id = Some(commit.sale.gateway_payment_id.clone());
        sale.gateway_customer_id = commit.sale.gateway_customer_id.clone();
        sale.last_payment_date = Some(commit.sale.last_payment_date);
        sale.version += 1;
        sale.updated_at = Utc::now();

        inner.payments.push(commit.record.clone());
        inner.audit.push(commit.audit.clone());

        Ok(CommitOutcome::Applied)
    }

    async fn mark_overdue(
        &self,
        sale_id: &str,
        expected_version: i64,
        overdue_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(sale) = inner.sales.get_mut(sale_id) else {
            return Err(StoreError::Conflict);
        };
        if sale.version != expected_version {
            return Err(StoreError::Conflict);
        }

        sale.payment_status = PaymentStatus::Vencido;
        sale.overdue_date = Some(overdue_at);
        sale.version += 1;
        sale.updated_at = Utc::now();

        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.inner.lock().await.audit.push(entry.clone());
        Ok(())
    }
}

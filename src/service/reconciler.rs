use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::event::PaymentNotice;
use crate::domain::sale::{derive_status, PaymentStatus};
use crate::error::WebhookError;
use crate::store::ledger::{
    AuditEntry, CommitOutcome, ConfirmationCommit, LedgerStore, PaymentRecord, SaleMutation,
    StoreError,
};

const MAX_COMMIT_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn LedgerStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Applied {
        status: PaymentStatus,
        paid_minor: i64,
    },
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverdueOutcome {
    Marked,
    Skipped { status: Option<PaymentStatus> },
}

impl Reconciler {
    /// Applies a confirmed payment to the sale. The read-compute-commit
    /// sequence is optimistic: the commit is conditioned on the sale version
    /// read here, and a conflict re-reads and retries a bounded number of
    /// times. The payment record's external_id uniqueness makes redelivery a
    /// no-op even when two deliveries race past the pre-check.
    pub async fn apply_confirmation(
        &self,
        sale_id: &str,
        notice: &PaymentNotice,
    ) -> Result<ConfirmationOutcome, WebhookError> {
        let amount = notice
            .amount_minor
            .ok_or_else(|| WebhookError::MalformedPayload("payment value is required".to_string()))?;
        if amount <= 0 {
            return Err(WebhookError::InvalidAmount(amount));
        }

        if self
            .store
            .find_payment_by_external_id(&notice.payment_id)
            .await?
            .is_some()
        {
            tracing::info!(payment_id = %notice.payment_id, "payment already applied, skipping");
            return Ok(ConfirmationOutcome::AlreadyApplied);
        }

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let sale = self
                .store
                .get_sale(sale_id)
                .await?
                .ok_or_else(|| WebhookError::SaleNotFound(sale_id.to_string()))?;

            let new_paid = sale.paid_minor + amount;
            let new_status = derive_status(new_paid, sale.total_minor);
            let now = Utc::now();

            let commit = ConfirmationCommit {
                sale: SaleMutation {
                    sale_id: sale.id.clone(),
                    expected_version: sale.version,
                    paid_minor: new_paid,
                    payment_status: new_status,
                    gateway_payment_id: notice.payment_id.clone(),
                    gateway_customer_id: notice.customer_id.clone(),
                    last_payment_date: now,
                },
                record: PaymentRecord {
                    sale_id: sale.id.clone(),
                    amount_minor: amount,
                    method: notice.method,
                    external_id: notice.payment_id.clone(),
                    customer_id: notice.customer_id.clone(),
                    billing_type: notice.billing_type.clone(),
                    source: "asaas".to_string(),
                    status: "confirmed".to_string(),
                    notes: format!("Pagamento Asaas (ID: {})", notice.payment_id),
                    created_at: now,
                },
                audit: AuditEntry {
                    id: Uuid::new_v4(),
                    event: notice.event_name.clone(),
                    sale_id: Some(sale.id.clone()),
                    payment_id: Some(notice.payment_id.clone()),
                    customer_id: notice.customer_id.clone(),
                    amount_minor: Some(amount),
                    billing_type: notice.billing_type.clone(),
                    status: Some(new_status.as_str().to_string()),
                    success: true,
                    error: None,
                    processed_at: now,
                },
            };

            match self.store.commit_confirmation(&commit).await {
                Ok(CommitOutcome::Applied) => {
                    tracing::info!(
                        sale_id = %sale.id,
                        payment_id = %notice.payment_id,
                        status = new_status.as_str(),
                        paid_minor = new_paid,
                        "payment confirmation applied"
                    );
                    return Ok(ConfirmationOutcome::Applied {
                        status: new_status,
                        paid_minor: new_paid,
                    });
                }
                Ok(CommitOutcome::Duplicate) => {
                    tracing::info!(payment_id = %notice.payment_id, "duplicate delivery caught at commit");
                    return Ok(ConfirmationOutcome::AlreadyApplied);
                }
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(WebhookError::ConflictExhausted(sale_id.to_string()))
    }

    /// Marks a sale overdue, but only from `pendente`: a sale with any
    /// payment evidence is never regressed.
    pub async fn apply_overdue(&self, sale_id: &str) -> Result<OverdueOutcome, WebhookError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let Some(sale) = self.store.get_sale(sale_id).await? else {
                return Ok(OverdueOutcome::Skipped { status: None });
            };

            if sale.payment_status != PaymentStatus::Pendente {
                return Ok(OverdueOutcome::Skipped {
                    status: Some(sale.payment_status),
                });
            }

            match self.store.mark_overdue(sale_id, sale.version, Utc::now()).await {
                Ok(()) => {
                    tracing::warn!(sale_id, "sale marked overdue");
                    return Ok(OverdueOutcome::Marked);
                }
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(WebhookError::ConflictExhausted(sale_id.to_string()))
    }
}

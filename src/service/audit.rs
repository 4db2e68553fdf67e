use std::sync::Arc;

use crate::store::ledger::{AuditEntry, LedgerStore};

#[derive(Clone)]
pub struct AuditRecorder {
    pub store: Arc<dyn LedgerStore>,
}

impl AuditRecorder {
    /// Appends the entry with one bounded retry. A failed audit write never
    /// blocks the webhook response; it is surfaced on the error channel.
    pub async fn record(&self, entry: AuditEntry) {
        if self.store.append_audit(&entry).await.is_ok() {
            return;
        }
        if let Err(e) = self.store.append_audit(&entry).await {
            tracing::error!(
                event = %entry.event,
                sale_id = entry.sale_id.as_deref().unwrap_or(""),
                payment_id = entry.payment_id.as_deref().unwrap_or(""),
                error = %e,
                "failed to append webhook audit entry"
            );
        }
    }
}

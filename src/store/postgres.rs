use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::event::PaymentMethod;
use crate::domain::sale::{PaymentStatus, Sale};
use crate::store::ledger::{
    AuditEntry, CommitOutcome, ConfirmationCommit, LedgerStore, PaymentRecord, StoreError,
};

#[derive(Clone)]
pub struct PgLedgerStore {
    pub pool: PgPool,
}

impl PgLedgerStore {
    async fn insert_audit_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry: &AuditEntry,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_audit (
                id, event, sale_id, payment_id, customer_id, amount_minor,
                billing_type, status, success, error, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.event)
        .bind(&entry.sale_id)
        .bind(&entry.payment_id)
        .bind(&entry.customer_id)
        .bind(entry.amount_minor)
        .bind(&entry.billing_type)
        .bind(&entry.status)
        .bind(entry.success)
        .bind(&entry.error)
        .bind(entry.processed_at)
        .execute(tx.as_mut())
        .await
        .map_err(map_err)?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_sale(&self, sale_id: &str) -> Result<Option<Sale>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, total_minor, paid_minor, payment_status, gateway_payment_id,
                   gateway_customer_id, last_payment_date, overdue_date, version, updated_at
            FROM sales
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(row.map(|r| sale_from_row(&r)))
    }

    async fn find_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT sale_id, amount_minor, method, external_id, customer_id,
                   billing_type, source, status, notes, created_at
            FROM payments
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(row.map(|r| record_from_row(&r)))
    }

    async fn commit_confirmation(
        &self,
        commit: &ConfirmationCommit,
    ) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        // The uniqueness constraint on external_id is the idempotency
        // enforcement point; a redelivered payment inserts zero rows.
        let inserted = sqlx::query(
            r#"
            INSERT INTO payments (
                sale_id, amount_minor, method, external_id, customer_id,
                billing_type, source, status, notes, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(&commit.record.sale_id)
        .bind(commit.record.amount_minor)
        .bind(commit.record.method.as_str())
        .bind(&commit.record.external_id)
        .bind(&commit.record.customer_id)
        .bind(&commit.record.billing_type)
        .bind(&commit.record.source)
        .bind(&commit.record.status)
        .bind(&commit.record.notes)
        .bind(commit.record.created_at)
        .execute(tx.as_mut())
        .await
        .map_err(map_err)?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await.map_err(map_err)?;
            return Ok(CommitOutcome::Duplicate);
        }

        let updated = sqlx::query(
            r#"
            UPDATE sales
            SET paid_minor = $3,
                payment_status = $4,
                gateway_payment_id = $5,
                gateway_customer_id = $6,
                last_payment_date = $7,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(&commit.sale.sale_id)
        .bind(commit.sale.expected_version)
        .bind(commit.sale.paid_minor)
        .bind(commit.sale.payment_status.as_str())
        .bind(&commit.sale.gateway_payment_id)
        .bind(&commit.sale.gateway_customer_id)
        .bind(commit.sale.last_payment_date)
        .execute(tx.as_mut())
        .await
        .map_err(map_err)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(map_err)?;
            return Err(StoreError::Conflict);
        }

        Self::insert_audit_tx(&mut tx, &commit.audit).await?;

        tx.commit().await.map_err(map_err)?;
        Ok(CommitOutcome::Applied)
    }

    async fn mark_overdue(
        &self,
        sale_id: &str,
        expected_version: i64,
        overdue_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE sales
            SET payment_status = 'vencido',
                overdue_date = $3,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(sale_id)
        .bind(expected_version)
        .bind(overdue_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        Self::insert_audit_tx(&mut tx, entry).await?;
        tx.commit().await.map_err(map_err)?;
        Ok(())
    }
}

fn sale_from_row(row: &PgRow) -> Sale {
    Sale {
        id: row.get("id"),
        total_minor: row.get("total_minor"),
        paid_minor: row.get("paid_minor"),
        payment_status: PaymentStatus::parse(row.get::<String, _>("payment_status").as_str()),
        gateway_payment_id: row.get("gateway_payment_id"),
        gateway_customer_id: row.get("gateway_customer_id"),
        last_payment_date: row.get("last_payment_date"),
        overdue_date: row.get("overdue_date"),
        version: row.get("version"),
        updated_at: row.get("updated_at"),
    }
}

fn record_from_row(row: &PgRow) -> PaymentRecord {
    PaymentRecord {
        sale_id: row.get("sale_id"),
        amount_minor: row.get("amount_minor"),
        method: PaymentMethod::parse(row.get::<String, _>("method").as_str()),
        external_id: row.get("external_id"),
        customer_id: row.get("customer_id"),
        billing_type: row.get("billing_type"),
        source: row.get("source"),
        status: row.get("status"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    }
}

fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // serialization_failure / deadlock_detected: safe for the caller to retry
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::Conflict;
        }
    }
    StoreError::Unavailable(e.into())
}

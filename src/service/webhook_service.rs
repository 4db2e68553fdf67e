use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::decode::decode_notice;
use crate::domain::event::{EventType, PaymentNotice};
use crate::error::WebhookError;
use crate::service::audit::AuditRecorder;
use crate::service::reconciler::{ConfirmationOutcome, OverdueOutcome, Reconciler};
use crate::store::ledger::AuditEntry;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    pub message: String,
    #[serde(rename = "saleId", skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    #[serde(rename = "paymentId", skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

impl WebhookAck {
    fn processed(event_name: &str, sale_id: Option<String>, payment_id: Option<String>) -> Self {
        Self {
            status: Some("success"),
            message: format!("Evento {} processado com sucesso", event_name),
            sale_id,
            payment_id,
        }
    }

    fn ignored() -> Self {
        Self {
            status: None,
            message: "Ignorado: sem externalReference".to_string(),
            sale_id: None,
            payment_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookRejection {
    pub error: String,
}

fn reject(status: StatusCode, error: &str) -> (StatusCode, WebhookRejection) {
    (
        status,
        WebhookRejection {
            error: error.to_string(),
        },
    )
}

/// Drives one inbound delivery through decode, dedup, reconcile and audit.
/// Every post-authentication branch leaves an audit entry and every request
/// gets a definitive response; the gateway's redelivery relies on both.
#[derive(Clone)]
pub struct WebhookService {
    pub reconciler: Reconciler,
    pub audit: AuditRecorder,
}

impl WebhookService {
    pub async fn process(
        &self,
        raw: serde_json::Value,
    ) -> Result<WebhookAck, (StatusCode, WebhookRejection)> {
        let notice = match decode_notice(&raw) {
            Ok(notice) => notice,
            Err(e) => {
                let event_name = raw
                    .get("event")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                tracing::warn!(event = %event_name, error = %e, "rejecting malformed webhook payload");
                self.audit
                    .record(failure_entry(&event_name, None, None, &e))
                    .await;
                return Err(reject(StatusCode::BAD_REQUEST, "Payload inválido"));
            }
        };

        tracing::info!(
            event = %notice.event_name,
            payment_id = %notice.payment_id,
            sale_id = notice.sale_id.as_deref().unwrap_or(""),
            "webhook event received"
        );

        let Some(sale_id) = notice.sale_id.clone() else {
            tracing::info!(
                payment_id = %notice.payment_id,
                "payment without external reference, skipping ledger update"
            );
            self.audit
                .record(noop_entry(&notice, None, "ignorado"))
                .await;
            return Ok(WebhookAck::ignored());
        };

        match notice.event {
            EventType::PaymentConfirmed | EventType::PaymentReceived => {
                self.handle_confirmation(&sale_id, &notice).await
            }
            EventType::PaymentOverdue => self.handle_overdue(&sale_id, &notice).await,
            EventType::Unknown => {
                self.audit
                    .record(noop_entry(&notice, Some(sale_id.clone()), "ignorado"))
                    .await;
                Ok(WebhookAck::processed(
                    &notice.event_name,
                    Some(sale_id),
                    Some(notice.payment_id.clone()),
                ))
            }
        }
    }

    async fn handle_confirmation(
        &self,
        sale_id: &str,
        notice: &PaymentNotice,
    ) -> Result<WebhookAck, (StatusCode, WebhookRejection)> {
        match self.reconciler.apply_confirmation(sale_id, notice).await {
            // the audit entry for an applied confirmation is written inside
            // the commit transaction
            Ok(ConfirmationOutcome::Applied { .. }) => Ok(WebhookAck::processed(
                &notice.event_name,
                Some(sale_id.to_string()),
                Some(notice.payment_id.clone()),
            )),
            Ok(ConfirmationOutcome::AlreadyApplied) => {
                self.audit
                    .record(noop_entry(notice, Some(sale_id.to_string()), "duplicado"))
                    .await;
                Ok(WebhookAck::processed(
                    &notice.event_name,
                    Some(sale_id.to_string()),
                    Some(notice.payment_id.clone()),
                ))
            }
            Err(e) => {
                self.audit
                    .record(failure_entry(
                        &notice.event_name,
                        Some(sale_id.to_string()),
                        Some(notice.payment_id.clone()),
                        &e,
                    ))
                    .await;
                Err(map_error(&e))
            }
        }
    }

    async fn handle_overdue(
        &self,
        sale_id: &str,
        notice: &PaymentNotice,
    ) -> Result<WebhookAck, (StatusCode, WebhookRejection)> {
        match self.reconciler.apply_overdue(sale_id).await {
            Ok(OverdueOutcome::Marked) => {
                self.audit
                    .record(noop_entry(notice, Some(sale_id.to_string()), "vencido"))
                    .await;
                Ok(WebhookAck::processed(
                    &notice.event_name,
                    Some(sale_id.to_string()),
                    Some(notice.payment_id.clone()),
                ))
            }
            Ok(OverdueOutcome::Skipped { status }) => {
                let tag = status.map(|s| s.as_str()).unwrap_or("ignorado");
                self.audit
                    .record(noop_entry(notice, Some(sale_id.to_string()), tag))
                    .await;
                Ok(WebhookAck::processed(
                    &notice.event_name,
                    Some(sale_id.to_string()),
                    Some(notice.payment_id.clone()),
                ))
            }
            Err(e) => {
                self.audit
                    .record(failure_entry(
                        &notice.event_name,
                        Some(sale_id.to_string()),
                        Some(notice.payment_id.clone()),
                        &e,
                    ))
                    .await;
                Err(map_error(&e))
            }
        }
    }
}

fn map_error(e: &WebhookError) -> (StatusCode, WebhookRejection) {
    match e {
        WebhookError::MalformedPayload(_) => reject(StatusCode::BAD_REQUEST, "Payload inválido"),
        WebhookError::SaleNotFound(_) => reject(StatusCode::NOT_FOUND, "Venda não encontrada"),
        WebhookError::InvalidAmount(_) => reject(StatusCode::BAD_REQUEST, "Valor inválido"),
        WebhookError::ConflictExhausted(_) | WebhookError::Store(_) => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn noop_entry(notice: &PaymentNotice, sale_id: Option<String>, status: &str) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4(),
        event: notice.event_name.clone(),
        sale_id,
        payment_id: Some(notice.payment_id.clone()),
        customer_id: notice.customer_id.clone(),
        amount_minor: notice.amount_minor,
        billing_type: notice.billing_type.clone(),
        status: Some(status.to_string()),
        success: true,
        error: None,
        processed_at: Utc::now(),
    }
}

fn failure_entry(
    event_name: &str,
    sale_id: Option<String>,
    payment_id: Option<String>,
    error: &WebhookError,
) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4(),
        event: event_name.to_string(),
        sale_id,
        payment_id,
        customer_id: None,
        amount_minor: None,
        billing_type: None,
        status: None,
        success: false,
        error: Some(error.to_string()),
        processed_at: Utc::now(),
    }
}

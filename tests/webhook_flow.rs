use std::sync::Arc;

use asaas_reconciler::domain::sale::{PaymentStatus, Sale};
use asaas_reconciler::service::audit::AuditRecorder;
use asaas_reconciler::service::reconciler::Reconciler;
use asaas_reconciler::service::webhook_service::WebhookService;
use asaas_reconciler::store::ledger::LedgerStore;
use asaas_reconciler::store::memory::MemoryLedgerStore;
use axum::http::StatusCode;
use serde_json::json;

fn service(store: Arc<MemoryLedgerStore>) -> WebhookService {
    let store: Arc<dyn LedgerStore> = store;
    WebhookService {
        reconciler: Reconciler {
            store: store.clone(),
        },
        audit: AuditRecorder { store },
    }
}

fn confirmation(event: &str, payment_id: &str, sale_id: &str, value: f64) -> serde_json::Value {
    json!({
        "event": event,
        "payment": {
            "id": payment_id,
            "externalReference": sale_id,
            "customer": "cus_1",
            "value": value,
            "billingType": "PIX"
        }
    })
}

fn overdue(sale_id: &str) -> serde_json::Value {
    json!({
        "event": "PAYMENT_OVERDUE",
        "payment": {
            "id": "pay_overdue",
            "externalReference": sale_id,
            "customer": "cus_1",
            "value": 100.0,
            "billingType": "BOLETO"
        }
    })
}

#[tokio::test]
async fn partial_then_full_then_redelivery() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    let ack = svc
        .process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 60.0))
        .await
        .unwrap();
    assert_eq!(ack.status, Some("success"));
    assert_eq!(ack.sale_id.as_deref(), Some("S1"));
    assert_eq!(ack.payment_id.as_deref(), Some("P1"));

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 6_000);
    assert_eq!(sale.payment_status, PaymentStatus::Parcial);
    assert_eq!(sale.gateway_payment_id.as_deref(), Some("P1"));
    assert_eq!(sale.gateway_customer_id.as_deref(), Some("cus_1"));
    assert!(sale.last_payment_date.is_some());

    svc.process(confirmation("PAYMENT_RECEIVED", "P2", "S1", 40.0))
        .await
        .unwrap();

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 10_000);
    assert_eq!(sale.payment_status, PaymentStatus::Pago);
    assert_eq!(sale.gateway_payment_id.as_deref(), Some("P2"));

    // gateway redelivers P2: acknowledged, nothing double-counted
    let ack = svc
        .process(confirmation("PAYMENT_RECEIVED", "P2", "S1", 40.0))
        .await
        .unwrap();
    assert_eq!(ack.status, Some("success"));

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 10_000);
    assert_eq!(sale.payment_status, PaymentStatus::Pago);
    assert_eq!(store.payment_records().await.len(), 2);
}

#[tokio::test]
async fn overpayment_is_accepted_and_pago() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    svc.process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 150.0))
        .await
        .unwrap();

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 15_000);
    assert_eq!(sale.payment_status, PaymentStatus::Pago);
}

#[tokio::test]
async fn confirmation_after_pago_still_appends_record() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 5_000)).await;
    let svc = service(store.clone());

    svc.process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 50.0))
        .await
        .unwrap();
    svc.process(confirmation("PAYMENT_CONFIRMED", "P2", "S1", 10.0))
        .await
        .unwrap();

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 6_000);
    assert_eq!(sale.payment_status, PaymentStatus::Pago);
    assert_eq!(store.payment_records().await.len(), 2);
}

#[tokio::test]
async fn overdue_marks_pendente_sale() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    let ack = svc.process(overdue("S1")).await.unwrap();
    assert_eq!(ack.status, Some("success"));

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.payment_status, PaymentStatus::Vencido);
    assert!(sale.overdue_date.is_some());
}

#[tokio::test]
async fn overdue_never_regresses_a_paying_sale() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    store.insert_sale(Sale::new("S2", 10_000)).await;
    let svc = service(store.clone());

    svc.process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 60.0))
        .await
        .unwrap();
    svc.process(confirmation("PAYMENT_CONFIRMED", "P2", "S2", 100.0))
        .await
        .unwrap();

    svc.process(overdue("S1")).await.unwrap();
    svc.process(overdue("S2")).await.unwrap();

    assert_eq!(
        store.sale("S1").await.unwrap().payment_status,
        PaymentStatus::Parcial
    );
    assert_eq!(
        store.sale("S2").await.unwrap().payment_status,
        PaymentStatus::Pago
    );
}

#[tokio::test]
async fn late_payment_clears_vencido() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    svc.process(overdue("S1")).await.unwrap();
    assert_eq!(
        store.sale("S1").await.unwrap().payment_status,
        PaymentStatus::Vencido
    );

    svc.process(confirmation("PAYMENT_RECEIVED", "P1", "S1", 60.0))
        .await
        .unwrap();

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.payment_status, PaymentStatus::Parcial);
    assert_eq!(sale.paid_minor, 6_000);
}

#[tokio::test]
async fn overdue_for_missing_sale_is_acknowledged() {
    let store = Arc::new(MemoryLedgerStore::new());
    let svc = service(store.clone());

    let ack = svc.process(overdue("missing")).await.unwrap();
    assert_eq!(ack.status, Some("success"));
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn unlinked_payment_is_ignored() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    let ack = svc
        .process(json!({
            "event": "PAYMENT_CONFIRMED",
            "payment": {"id": "P1", "customer": "cus_1", "value": 60.0, "billingType": "PIX"}
        }))
        .await
        .unwrap();

    assert_eq!(ack.status, None);
    assert_eq!(ack.message, "Ignorado: sem externalReference");

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 0);
    assert_eq!(sale.payment_status, PaymentStatus::Pendente);
    assert!(store.payment_records().await.is_empty());
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn unknown_event_is_acknowledged_without_mutation() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    let ack = svc
        .process(json!({
            "event": "PAYMENT_REFUNDED",
            "payment": {"id": "P1", "externalReference": "S1", "value": 60.0}
        }))
        .await
        .unwrap();
    assert_eq!(ack.status, Some("success"));

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 0);
    assert!(store.payment_records().await.is_empty());
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn missing_payment_object_is_rejected_and_audited() {
    let store = Arc::new(MemoryLedgerStore::new());
    let svc = service(store.clone());

    let (status, rejection) = svc
        .process(json!({"event": "PAYMENT_CONFIRMED"}))
        .await
        .unwrap_err();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(rejection.error, "Payload inválido");

    let audit = store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
    assert_eq!(audit[0].event, "PAYMENT_CONFIRMED");
}

#[tokio::test]
async fn unresolvable_sale_is_a_404() {
    let store = Arc::new(MemoryLedgerStore::new());
    let svc = service(store.clone());

    let (status, rejection) = svc
        .process(confirmation("PAYMENT_CONFIRMED", "P1", "missing", 60.0))
        .await
        .unwrap_err();

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(rejection.error, "Venda não encontrada");
    assert!(store.payment_records().await.is_empty());

    let audit = store.audit_entries().await;
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
}

#[tokio::test]
async fn non_positive_amount_is_rejected_before_any_mutation() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    for value in [0.0, -25.0] {
        let (status, rejection) = svc
            .process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", value))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection.error, "Valor inválido");
    }

    let sale = store.sale("S1").await.unwrap();
    assert_eq!(sale.paid_minor, 0);
    assert!(store.payment_records().await.is_empty());
    assert_eq!(store.audit_entries().await.len(), 2);
}

#[tokio::test]
async fn duplicate_delivery_audits_as_noop() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_sale(Sale::new("S1", 10_000)).await;
    let svc = service(store.clone());

    svc.process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 60.0))
        .await
        .unwrap();
    svc.process(confirmation("PAYMENT_CONFIRMED", "P1", "S1", 60.0))
        .await
        .unwrap();

    let audit = store.audit_entries().await;
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|e| e.success));
    assert_eq!(audit[1].status.as_deref(), Some("duplicado"));
}

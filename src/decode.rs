use crate::domain::event::{EventType, PaymentMethod, PaymentNotice, WebhookBody};
use crate::error::WebhookError;

pub fn decode_notice(raw: &serde_json::Value) -> Result<PaymentNotice, WebhookError> {
    let body: WebhookBody = serde_json::from_value(raw.clone())
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    let event_name = body.event.unwrap_or_else(|| "unknown".to_string());
    let event = EventType::parse(&event_name);

    let payment = body
        .payment
        .ok_or_else(|| WebhookError::MalformedPayload("missing payment object".to_string()))?;

    Ok(PaymentNotice {
        event,
        event_name,
        payment_id: payment.id,
        sale_id: payment.external_reference.filter(|s| !s.is_empty()),
        customer_id: payment.customer,
        amount_minor: payment.value.map(to_minor),
        method: PaymentMethod::from_billing_type(payment.billing_type.as_deref()),
        billing_type: payment.billing_type,
    })
}

// Gateway sends decimal currency units; the ledger stores integer centavos.
fn to_minor(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

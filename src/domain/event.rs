use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    PaymentConfirmed,
    PaymentReceived,
    PaymentOverdue,
    Unknown,
}

impl EventType {
    pub fn parse(raw: &str) -> EventType {
        match raw {
            "PAYMENT_CONFIRMED" => EventType::PaymentConfirmed,
            "PAYMENT_RECEIVED" => EventType::PaymentReceived,
            "PAYMENT_OVERDUE" => EventType::PaymentOverdue,
            _ => EventType::Unknown,
        }
    }

    pub fn is_confirmation(self) -> bool {
        matches!(self, EventType::PaymentConfirmed | EventType::PaymentReceived)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CartaoCredito,
    CartaoDebito,
    Boleto,
    Dinheiro,
}

impl PaymentMethod {
    pub fn from_billing_type(raw: Option<&str>) -> PaymentMethod {
        match raw {
            Some("PIX") => PaymentMethod::Pix,
            Some("CREDIT_CARD") => PaymentMethod::CartaoCredito,
            Some("DEBIT_CARD") => PaymentMethod::CartaoDebito,
            Some("BOLETO") => PaymentMethod::Boleto,
            _ => PaymentMethod::Dinheiro,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::CartaoCredito => "cartao_credito",
            PaymentMethod::CartaoDebito => "cartao_debito",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::Dinheiro => "dinheiro",
        }
    }

    pub fn parse(s: &str) -> PaymentMethod {
        match s {
            "pix" => PaymentMethod::Pix,
            "cartao_credito" => PaymentMethod::CartaoCredito,
            "cartao_debito" => PaymentMethod::CartaoDebito,
            "boleto" => PaymentMethod::Boleto,
            _ => PaymentMethod::Dinheiro,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub payment: Option<PaymentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub id: String,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub billing_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentNotice {
    pub event: EventType,
    pub event_name: String,
    pub payment_id: String,
    pub sale_id: Option<String>,
    pub customer_id: Option<String>,
    pub amount_minor: Option<i64>,
    pub billing_type: Option<String>,
    pub method: PaymentMethod,
}

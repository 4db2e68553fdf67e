use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pendente,
    Parcial,
    Pago,
    Vencido,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pendente => "pendente",
            PaymentStatus::Parcial => "parcial",
            PaymentStatus::Pago => "pago",
            PaymentStatus::Vencido => "vencido",
        }
    }

    pub fn parse(s: &str) -> PaymentStatus {
        match s {
            "parcial" => PaymentStatus::Parcial,
            "pago" => PaymentStatus::Pago,
            "vencido" => PaymentStatus::Vencido,
            _ => PaymentStatus::Pendente,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub payment_status: PaymentStatus,
    pub gateway_payment_id: Option<String>,
    pub gateway_customer_id: Option<String>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub overdue_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(id: impl Into<String>, total_minor: i64) -> Self {
        Self {
            id: id.into(),
            total_minor,
            paid_minor: 0,
            payment_status: PaymentStatus::Pendente,
            gateway_payment_id: None,
            gateway_customer_id: None,
            last_payment_date: None,
            overdue_date: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

pub fn derive_status(paid_minor: i64, total_minor: i64) -> PaymentStatus {
    if paid_minor >= total_minor {
        PaymentStatus::Pago
    } else if paid_minor > 0 {
        PaymentStatus::Parcial
    } else {
        PaymentStatus::Pendente
    }
}

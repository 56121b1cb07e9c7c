// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

// Formas de pagamento aceitas no PDV. No banco fica o rótulo em texto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    CreditCard,
    DebitCard,
    Pix,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    /// Rótulo ausente, vazio ou desconhecido vira dinheiro.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("credit_card") => PaymentMethod::CreditCard,
            Some("debit_card") => PaymentMethod::DebitCard,
            Some("pix") => PaymentMethod::Pix,
            Some("bank_transfer") => PaymentMethod::BankTransfer,
            _ => PaymentMethod::Cash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub client_id: Option<Uuid>,
    pub user_id: Uuid,
    #[schema(example = "31.50")]
    pub total_amount: Decimal,
    #[schema(example = "3.50")]
    pub discount_amount: Decimal,
    #[schema(example = "pix")]
    pub payment_method: Option<String>,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub header: Sale,
    pub client_name: Option<String>,
    pub items: Vec<SaleItem>,
}

// --- Pedido de criação de venda (o que o PDV envia ao finalizar) ---

#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraftItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraft {
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleDraftItem>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

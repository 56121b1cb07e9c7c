// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

// --- Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    #[schema(example = "Bebidas")]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Produtos ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[schema(example = "Café Torrado 500g")]
    pub name: String,
    #[schema(example = "CAF-500")]
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    #[schema(example = "24.90")]
    pub price: Decimal,
    #[schema(example = "15.00")]
    pub cost_price: Decimal,
    #[schema(example = 12)]
    pub stock_quantity: i32,
    #[schema(example = 5)]
    pub min_stock: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_low_stock(&self) -> bool {
        self.is_active() && self.stock_quantity <= self.min_stock
    }
}

// Campos editáveis de um produto (criação e atualização usam o mesmo formato)
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost_price: Decimal,
    pub min_stock: i32,
    pub status: ProductStatus,
}

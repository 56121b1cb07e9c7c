// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Uma configuração por chave (ex.: "store_profile", "receipt_footer")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemSetting {
    #[schema(ignore)] // O contexto (Header) já define a loja
    pub company_id: Uuid,

    #[schema(example = "receipt_footer")]
    pub key: String,

    #[schema(value_type = Object)]
    pub value: Value,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingRequest {
    #[schema(value_type = Object)]
    pub value: Value,
}

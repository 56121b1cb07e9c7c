// src/db/settings_repo.rs

use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::settings::SystemSetting};

#[derive(Clone, Default)]
pub struct SettingsRepository;

impl SettingsRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list_settings<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<SystemSetting>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Empresa sem configurações devolve lista vazia; o painel usa os padrões dele.
        let settings = sqlx::query_as::<_, SystemSetting>(
            "SELECT * FROM system_settings WHERE company_id = $1 ORDER BY key ASC",
        )
            .bind(company_id)
            .fetch_all(executor)
            .await?;
        Ok(settings)
    }

    pub async fn upsert_setting<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        key: &str,
        value: &Value,
    ) -> Result<SystemSetting, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"
            INSERT INTO system_settings (company_id, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (company_id, key)
            DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(key)
            .bind(value)
            .fetch_one(executor)
            .await?;

        Ok(setting)
    }
}

// src/db/inventory_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_constraint_error, AppError},
    models::{
        catalog::Product,
        inventory::{MovementType, StockMovement},
    },
};

#[derive(Clone, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    pub fn new() -> Self {
        Self
    }

    /// Aplica a movimentação ao saldo do produto, de forma atômica.
    /// Saldo negativo é barrado pelo CHECK da tabela e vira `InsufficientStock`.
    pub async fn apply_stock_change<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                stock_quantity = CASE $3::stock_movement_type
                    WHEN 'in' THEN stock_quantity + $4
                    WHEN 'out' THEN stock_quantity - $4
                    ELSE $4
                END,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(product_id)
            .bind(company_id)
            .bind(movement_type)
            .bind(quantity)
            .fetch_optional(executor)
            .await
            .map_err(map_constraint_error)?
            .ok_or(AppError::NotFound("product"))
    }

    /// Registra uma movimentação no livro-razão.
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        reason: Option<&str>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (company_id, product_id, type, quantity, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(product_id)
            .bind(movement_type)
            .bind(quantity)
            .bind(reason)
            .fetch_one(executor)
            .await?;
        Ok(movement)
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR product_id = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
            .bind(company_id)
            .bind(product_id)
            .bind(limit)
            .fetch_all(executor)
            .await?;
        Ok(movements)
    }
}

// src/db/sales_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_constraint_error, AppError},
    models::sales::{Sale, SaleDraft, SaleDraftItem, SaleItem, SaleStatus},
};

#[derive(Clone, Default)]
pub struct SalesRepository;

impl SalesRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        draft: &SaleDraft,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                company_id, client_id, user_id, total_amount, discount_amount,
                payment_method, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(draft.client_id)
            .bind(draft.user_id)
            .bind(draft.total_amount)
            .bind(draft.discount_amount)
            .bind(draft.payment_method.as_str())
            .bind(SaleStatus::Completed)
            .fetch_one(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(sale)
    }

    pub async fn insert_sale_item<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        sale_id: Uuid,
        item: &SaleDraftItem,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total_price = item.unit_price * rust_decimal::Decimal::from(item.quantity);

        let sale_item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (company_id, sale_id, product_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sale_id, product_id, quantity, unit_price, total_price
            "#,
        )
            .bind(company_id)
            .bind(sale_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(total_price)
            .fetch_one(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(sale_item)
    }

    /// Vendas da empresa, mais recentes primeiro. `since` limita a janela.
    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE company_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
            .bind(company_id)
            .bind(since)
            .bind(limit)
            .fetch_all(executor)
            .await?;
        Ok(sales)
    }

    pub async fn get_sale<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 AND company_id = $2")
            .bind(sale_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("sale"))
    }

    pub async fn list_sale_items<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price, total_price
            FROM sale_items
            WHERE company_id = $1 AND sale_id = $2
            "#,
        )
            .bind(company_id)
            .bind(sale_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }
}

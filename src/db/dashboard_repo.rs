// src/db/dashboard_repo.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{DashboardSummary, TopProductEntry},
};

#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    // 1. Resumo Geral
    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Transação só para ler um snapshot consistente
        let mut tx = executor.begin().await?;

        // A. Vendas concluídas hoje
        let (sales_today, sales_count_today): (Decimal, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
            FROM sales
            WHERE company_id = $1
              AND status = 'completed'
              AND created_at::date = CURRENT_DATE
            "#,
        )
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;

        // B. Clientes
        let total_clients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;

        // C. Produtos ativos, estoque baixo e valor do estoque
        let (active_products, low_stock_count, stock_value): (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE stock_quantity <= min_stock),
                COALESCE(SUM(price * stock_quantity), 0)
            FROM products
            WHERE company_id = $1 AND status = 'active'
            "#,
        )
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            sales_today,
            sales_count_today,
            total_clients,
            active_products,
            low_stock_count,
            stock_value,
        })
    }

    // 2. Curva ABC (produtos mais vendidos em R$)
    pub async fn get_top_products<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TopProductEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let data = sqlx::query_as::<_, TopProductEntry>(
            r#"
            SELECT
                p.name AS product_name,
                SUM(si.quantity)::bigint AS total_quantity,
                SUM(si.total_price) AS total_revenue
            FROM sale_items si
            JOIN sales s ON si.sale_id = s.id
            JOIN products p ON si.product_id = p.id
            WHERE s.company_id = $1
              AND s.status = 'completed'
            GROUP BY p.id, p.name
            ORDER BY total_revenue DESC
            LIMIT $2
            "#,
        )
            .bind(company_id)
            .bind(limit)
            .fetch_all(executor)
            .await?;

        Ok(data)
    }
}

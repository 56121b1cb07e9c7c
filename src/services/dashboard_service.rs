// src/services/dashboard_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{DashboardSummary, TopProductEntry},
};

pub const DEFAULT_TOP_PRODUCTS: i64 = 5;
const MAX_TOP_PRODUCTS: i64 = 50;

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_summary<'e, E>(&self, executor: E, company_id: Uuid) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        self.repo.get_summary(executor, company_id).await
    }

    pub async fn get_top_products<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<TopProductEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let limit = limit.unwrap_or(DEFAULT_TOP_PRODUCTS).clamp(1, MAX_TOP_PRODUCTS);
        self.repo.get_top_products(executor, company_id, limit).await
    }
}

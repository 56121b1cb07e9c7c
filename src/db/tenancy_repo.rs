// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::UserCompany,
        tenancy::{Company, CompanyMember},
    },
};

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um usuário pertence à empresa.
    /// É a verificação de autorização feita em toda rota com x-tenant-id.
    pub async fn is_member(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM company_members
                WHERE user_id = $1 AND company_id = $2
            )
            "#,
        )
            .bind(user_id)
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn create_company<'e, E>(&self, executor: E, name: &str) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (name) VALUES ($1) RETURNING *",
        )
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(company)
    }

    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        role: &str,
    ) -> Result<CompanyMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, CompanyMember>(
            r#"
            INSERT INTO company_members (user_id, company_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(company_id)
            .bind(role)
            .fetch_one(executor)
            .await?;
        Ok(member)
    }

    pub async fn list_user_companies(&self, user_id: Uuid) -> Result<Vec<UserCompany>, AppError> {
        let companies = sqlx::query_as::<_, UserCompany>(
            r#"
            SELECT c.id AS company_id, c.name AS company_name, m.role
            FROM company_members m
            JOIN companies c ON c.id = m.company_id
            WHERE m.user_id = $1
            ORDER BY c.name ASC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }
}

// src/db/partner_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::partners::{Client, ClientInput, Supplier, SupplierInput},
};

#[derive(Clone, Default)]
pub struct PartnerRepository;

impl PartnerRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn list_clients<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT * FROM clients
            WHERE company_id = $1
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%'
                   OR email ILIKE '%' || $2 || '%'
                   OR phone ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            "#,
        )
            .bind(company_id)
            .bind(search)
            .fetch_all(executor)
            .await?;
        Ok(clients)
    }

    pub async fn get_client<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1 AND company_id = $2")
            .bind(client_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("client"))
    }

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &ClientInput,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (company_id, name, email, phone, document, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.document)
            .bind(&input.address)
            .bind(&input.notes)
            .fetch_one(executor)
            .await?;
        Ok(client)
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        client_id: Uuid,
        input: &ClientInput,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients SET
                name = $3, email = $4, phone = $5, document = $6,
                address = $7, notes = $8, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(client_id)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.document)
            .bind(&input.address)
            .bind(&input.notes)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("client"))
    }

    pub async fn delete_client<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND company_id = $2")
            .bind(client_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("client"));
        }
        Ok(())
    }

    /// Quantos clientes podem receber e-mail (destinatários de campanha).
    pub async fn count_clients_with_email<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clients WHERE company_id = $1 AND email IS NOT NULL AND email <> ''",
        )
            .bind(company_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    // =========================================================================
    //  FORNECEDORES
    // =========================================================================

    pub async fn list_suppliers<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE company_id = $1 ORDER BY name ASC",
        )
            .bind(company_id)
            .fetch_all(executor)
            .await?;
        Ok(suppliers)
    }

    pub async fn create_supplier<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &SupplierInput,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (company_id, name, contact_name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.contact_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.notes)
            .fetch_one(executor)
            .await?;
        Ok(supplier)
    }

    pub async fn update_supplier<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        supplier_id: Uuid,
        input: &SupplierInput,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                name = $3, contact_name = $4, email = $5, phone = $6,
                address = $7, notes = $8, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(supplier_id)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.contact_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.notes)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("supplier"))
    }

    pub async fn delete_supplier<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND company_id = $2")
            .bind(supplier_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("supplier"));
        }
        Ok(())
    }
}

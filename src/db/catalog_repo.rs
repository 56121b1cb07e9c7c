// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_constraint_error, map_delete_error, AppError},
    models::catalog::{Category, Product, ProductInput},
};

#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // `search` filtra por nome, SKU ou código de barras
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE company_id = $1
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%'
                   OR sku ILIKE '%' || $2 || '%'
                   OR barcode = $2)
            ORDER BY name ASC
            "#,
        )
            .bind(company_id)
            .bind(search)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND company_id = $2")
            .bind(product_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("product"))
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &ProductInput,
        initial_stock: i32,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                company_id, category_id, supplier_id, name, sku, barcode, description,
                price, cost_price, stock_quantity, min_stock, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(input.category_id)
            .bind(input.supplier_id)
            .bind(&input.name)
            .bind(&input.sku)
            .bind(&input.barcode)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.cost_price)
            .bind(initial_stock)
            .bind(input.min_stock)
            .bind(input.status)
            .fetch_one(executor)
            .await
            .map_err(map_constraint_error)
    }

    /// Atualiza o cadastro. O saldo (stock_quantity) só muda por movimentação.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
        input: &ProductInput,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                category_id = $3,
                supplier_id = $4,
                name = $5,
                sku = $6,
                barcode = $7,
                description = $8,
                price = $9,
                cost_price = $10,
                min_stock = $11,
                status = $12,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(product_id)
            .bind(company_id)
            .bind(input.category_id)
            .bind(input.supplier_id)
            .bind(&input.name)
            .bind(&input.sku)
            .bind(&input.barcode)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.cost_price)
            .bind(input.min_stock)
            .bind(input.status)
            .fetch_optional(executor)
            .await
            .map_err(map_constraint_error)?
            .ok_or(AppError::NotFound("product"))
    }

    pub async fn delete_product<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Produto já vendido fica preso pelo histórico (sale_items)
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND company_id = $2")
            .bind(product_id)
            .bind(company_id)
            .execute(executor)
            .await
            .map_err(map_delete_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("product"));
        }
        Ok(())
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE company_id = $1 ORDER BY name ASC",
        )
            .bind(company_id)
            .fetch_all(executor)
            .await?;
        Ok(categories)
    }

    /// Cria ou (com `category_id`) renomeia uma categoria.
    pub async fn save_category<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        category_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = match category_id {
            None => sqlx::query_as::<_, Category>(
                r#"
                INSERT INTO categories (company_id, name, description)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
                .bind(company_id),
            Some(id) => sqlx::query_as::<_, Category>(
                r#"
                UPDATE categories SET name = $3, description = $4, updated_at = NOW()
                WHERE company_id = $1 AND id = $2
                RETURNING *
                "#,
            )
                .bind(company_id)
                .bind(id),
        };

        query
            .bind(name)
            .bind(description)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::CategoryNameAlreadyExists(name.to_string());
                    }
                }
                e.into()
            })?
            .ok_or(AppError::NotFound("category"))
    }

    pub async fn delete_category<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND company_id = $2")
            .bind(category_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("category"));
        }
        Ok(())
    }
}

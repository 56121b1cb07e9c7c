// src/services/catalog_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, InventoryRepository},
    models::{
        catalog::{Category, Product, ProductInput},
        inventory::MovementType,
    },
    services::realtime::{ChangeAction, ChangeFeed},
};

const INITIAL_STOCK_REASON: &str = "Estoque inicial";

#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
    inventory_repo: InventoryRepository,
    feed: ChangeFeed,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository, inventory_repo: InventoryRepository, feed: ChangeFeed) -> Self {
        Self { catalog_repo, inventory_repo, feed }
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
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.catalog_repo.list_products(executor, company_id, search).await
    }

    pub async fn get_product<'e, E>(&self, executor: E, company_id: Uuid, product_id: Uuid) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.get_product(executor, company_id, product_id).await
    }

    /// Cria o produto. Estoque inicial > 0 também gera a entrada no livro-razão.
    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &ProductInput,
        initial_stock: i32,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let product = self
            .catalog_repo
            .create_product(&mut *tx, company_id, input, initial_stock)
            .await?;

        if initial_stock > 0 {
            self.inventory_repo
                .record_movement(
                    &mut *tx,
                    company_id,
                    product.id,
                    MovementType::In,
                    initial_stock,
                    Some(INITIAL_STOCK_REASON),
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(%company_id, product_id = %product.id, initial_stock, "Produto criado");
        self.feed.publish(company_id, "products", ChangeAction::Insert, Some(product.id));
        Ok(product)
    }

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
        let product = self
            .catalog_repo
            .update_product(executor, company_id, product_id, input)
            .await?;
        self.feed.publish(company_id, "products", ChangeAction::Update, Some(product_id));
        Ok(product)
    }

    pub async fn delete_product<'e, E>(&self, executor: E, company_id: Uuid, product_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.delete_product(executor, company_id, product_id).await?;
        self.feed.publish(company_id, "products", ChangeAction::Delete, Some(product_id));
        Ok(())
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.list_categories(executor, company_id).await
    }

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
        let category = self
            .catalog_repo
            .save_category(executor, company_id, category_id, name.trim(), description)
            .await?;

        let action = if category_id.is_some() { ChangeAction::Update } else { ChangeAction::Insert };
        self.feed.publish(company_id, "categories", action, Some(category.id));
        Ok(category)
    }

    pub async fn delete_category<'e, E>(&self, executor: E, company_id: Uuid, category_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.catalog_repo.delete_category(executor, company_id, category_id).await?;
        self.feed.publish(company_id, "categories", ChangeAction::Delete, Some(category_id));
        Ok(())
    }
}

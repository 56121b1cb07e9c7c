// src/services/inventory_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{CatalogRepository, InventoryRepository},
    models::{
        catalog::Product,
        inventory::{MovementType, StockMovement},
    },
    services::{
        notification_service::{crossed_into_low_stock, NotificationService},
        realtime::{ChangeAction, ChangeFeed},
    },
};

const MAX_MOVEMENTS: i64 = 500;

/// Entrada e saída exigem quantidade positiva; ajuste aceita zero (zerar o saldo).
pub fn check_movement_quantity(movement_type: MovementType, quantity: i32) -> Result<(), AppError> {
    let valid = match movement_type {
        MovementType::In | MovementType::Out => quantity > 0,
        MovementType::Adjustment => quantity >= 0,
    };
    if valid {
        return Ok(());
    }

    let mut err = ValidationError::new("range");
    err.message = Some("Quantidade inválida para o tipo de movimentação.".into());
    let mut errors = ValidationErrors::new();
    errors.add("quantity", err);
    Err(AppError::ValidationError(errors))
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    catalog_repo: CatalogRepository,
    notifications: NotificationService,
    feed: ChangeFeed,
}

impl InventoryService {
    pub fn new(
        inventory_repo: InventoryRepository,
        catalog_repo: CatalogRepository,
        notifications: NotificationService,
        feed: ChangeFeed,
    ) -> Self {
        Self { inventory_repo, catalog_repo, notifications, feed }
    }

    /// Altera o saldo e grava o registro no livro-razão na mesma transação.
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        reason: Option<&str>,
    ) -> Result<(StockMovement, Product), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        check_movement_quantity(movement_type, quantity)?;

        let mut tx = executor.begin().await?;

        let before = self.catalog_repo.get_product(&mut *tx, company_id, product_id).await?;

        let product = self
            .inventory_repo
            .apply_stock_change(&mut *tx, company_id, product_id, movement_type, quantity)
            .await?;

        let movement = self
            .inventory_repo
            .record_movement(&mut *tx, company_id, product_id, movement_type, quantity, reason)
            .await?;

        let alert = if crossed_into_low_stock(before.stock_quantity, &product) {
            Some(self.notifications.record_low_stock(&mut *tx, company_id, &product).await?)
        } else {
            None
        };

        tx.commit().await?;

        tracing::info!(
            %company_id,
            %product_id,
            ?movement_type,
            quantity,
            stock = product.stock_quantity,
            "Movimentação de estoque registrada"
        );
        self.feed.publish(company_id, "stock_movements", ChangeAction::Insert, Some(movement.id));
        self.feed.publish(company_id, "products", ChangeAction::Update, Some(product.id));
        if let Some(alert) = alert {
            self.notifications.publish_created(company_id, &[alert]);
        }

        Ok((movement, product))
    }

    pub async fn list_movements<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product_id: Option<Uuid>,
    ) -> Result<Vec<StockMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.inventory_repo
            .list_movements(executor, company_id, product_id, MAX_MOVEMENTS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_quantities() {
        assert!(check_movement_quantity(MovementType::In, 1).is_ok());
        assert!(matches!(
            check_movement_quantity(MovementType::In, 0),
            Err(AppError::ValidationError(_))
        ));
        assert!(check_movement_quantity(MovementType::Out, -2).is_err());
        assert!(check_movement_quantity(MovementType::Adjustment, 0).is_ok());
        assert!(check_movement_quantity(MovementType::Adjustment, -1).is_err());
    }
}

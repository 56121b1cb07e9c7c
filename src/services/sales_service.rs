// src/services/sales_service.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_tenant_tx, error::AppError},
    db::{InventoryRepository, PartnerRepository, SalesRepository},
    models::{
        inventory::MovementType,
        sales::{Sale, SaleDetail, SaleDraft},
    },
    services::{
        cart::SaleStore,
        notification_service::{crossed_into_low_stock, NotificationService},
        realtime::{ChangeAction, ChangeFeed},
    },
};

const SALE_MOVEMENT_REASON: &str = "Venda no PDV";

/// Confere o pedido antes de abrir a transação.
fn check_draft(draft: &SaleDraft) -> Result<(), AppError> {
    if draft.items.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if draft.items.iter().any(|i| i.quantity <= 0) {
        return Err(anyhow::anyhow!("Item de venda com quantidade não positiva").into());
    }

    let subtotal: Decimal = draft
        .items
        .iter()
        .map(|i| i.unit_price * Decimal::from(i.quantity))
        .sum();
    if subtotal != draft.subtotal || draft.subtotal - draft.discount_amount != draft.total_amount {
        return Err(anyhow::anyhow!("Totais do pedido não conferem com os itens").into());
    }
    Ok(())
}

#[derive(Clone)]
pub struct SalesService {
    pool: PgPool,
    sales_repo: SalesRepository,
    inventory_repo: InventoryRepository,
    partner_repo: PartnerRepository,
    notifications: NotificationService,
    feed: ChangeFeed,
}

impl SalesService {
    pub fn new(
        pool: PgPool,
        sales_repo: SalesRepository,
        inventory_repo: InventoryRepository,
        partner_repo: PartnerRepository,
        notifications: NotificationService,
        feed: ChangeFeed,
    ) -> Self {
        Self { pool, sales_repo, inventory_repo, partner_repo, notifications, feed }
    }

    pub async fn list_sales<'e, E>(&self, executor: E, company_id: Uuid, limit: i64) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.sales_repo.list_sales(executor, company_id, None, limit).await
    }

    /// Venda com itens e nome do cliente (se houver).
    pub async fn get_sale_detail(
        &self,
        conn: &mut PgConnection,
        company_id: Uuid,
        sale_id: Uuid,
    ) -> Result<SaleDetail, AppError> {
        let header = self.sales_repo.get_sale(&mut *conn, company_id, sale_id).await?;
        let items = self.sales_repo.list_sale_items(&mut *conn, company_id, sale_id).await?;

        let client_name = match header.client_id {
            Some(client_id) => match self.partner_repo.get_client(&mut *conn, company_id, client_id).await {
                Ok(client) => Some(client.name),
                // Cliente apagado depois da venda
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(SaleDetail { header, client_name, items })
    }
}

#[async_trait]
impl SaleStore for SalesService {
    /// Grava venda, itens, baixa de estoque e movimentações numa única transação.
    /// Se algum produto ficar negativo, nada é gravado (`InsufficientStock`).
    async fn create_sale(&self, company_id: Uuid, draft: SaleDraft) -> Result<Sale, AppError> {
        check_draft(&draft)?;

        let mut tx = begin_tenant_tx(&self.pool, company_id, draft.user_id).await?;

        let sale = self.sales_repo.insert_sale(&mut *tx, company_id, &draft).await?;

        let mut alerts = Vec::new();
        for item in &draft.items {
            // Baixa primeiro: produto removido do catálogo vira 404, não erro de FK
            let product = self
                .inventory_repo
                .apply_stock_change(&mut *tx, company_id, item.product_id, MovementType::Out, item.quantity)
                .await?;

            self.sales_repo
                .insert_sale_item(&mut *tx, company_id, sale.id, item)
                .await?;

            self.inventory_repo
                .record_movement(
                    &mut *tx,
                    company_id,
                    item.product_id,
                    MovementType::Out,
                    item.quantity,
                    Some(SALE_MOVEMENT_REASON),
                )
                .await?;

            if crossed_into_low_stock(product.stock_quantity + item.quantity, &product) {
                let alert = self
                    .notifications
                    .record_low_stock(&mut *tx, company_id, &product)
                    .await?;
                alerts.push(alert);
            }
        }

        tx.commit().await?;

        tracing::info!(
            %company_id,
            sale_id = %sale.id,
            items = draft.items.len(),
            "Venda gravada"
        );
        self.feed.publish(company_id, "sales", ChangeAction::Insert, Some(sale.id));
        self.feed.publish(company_id, "products", ChangeAction::Update, None);
        self.notifications.publish_created(company_id, &alerts);

        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sales::{PaymentMethod, SaleDraftItem};

    fn draft(items: Vec<(i32, i64)>, discount: i64) -> SaleDraft {
        let items: Vec<SaleDraftItem> = items
            .into_iter()
            .map(|(quantity, price)| SaleDraftItem {
                product_id: Uuid::new_v4(),
                quantity,
                unit_price: Decimal::from(price),
            })
            .collect();
        let subtotal: Decimal = items.iter().map(|i| i.unit_price * Decimal::from(i.quantity)).sum();
        SaleDraft {
            user_id: Uuid::new_v4(),
            client_id: None,
            payment_method: PaymentMethod::Cash,
            items,
            subtotal,
            discount_amount: Decimal::from(discount),
            total_amount: subtotal - Decimal::from(discount),
        }
    }

    #[test]
    fn consistent_draft_passes() {
        assert!(check_draft(&draft(vec![(2, 10), (1, 5)], 5)).is_ok());
    }

    #[test]
    fn empty_draft_is_empty_cart() {
        assert!(matches!(check_draft(&draft(vec![], 0)), Err(AppError::EmptyCart)));
    }

    #[test]
    fn tampered_totals_are_rejected() {
        let mut d = draft(vec![(2, 10)], 0);
        d.total_amount = Decimal::ONE;
        assert!(check_draft(&d).is_err());

        let mut d = draft(vec![(2, 10)], 0);
        d.items[0].quantity = 0;
        assert!(check_draft(&d).is_err());
    }
}

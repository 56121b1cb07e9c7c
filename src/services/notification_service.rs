// src/services/notification_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::EngagementRepository,
    models::{catalog::Product, engagement::Notification},
    services::realtime::{ChangeAction, ChangeFeed},
};

pub const NOTIFICATIONS_TABLE: &str = "notifications";

/// O produto acabou de entrar em estoque baixo (antes estava acima do mínimo)?
pub fn crossed_into_low_stock(previous_quantity: i32, product: &Product) -> bool {
    product.is_low_stock() && previous_quantity > product.min_stock
}

#[derive(Clone)]
pub struct NotificationService {
    repo: EngagementRepository,
    feed: ChangeFeed,
}

impl NotificationService {
    pub fn new(repo: EngagementRepository, feed: ChangeFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn list<'e, E>(&self, executor: E, company_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_notifications(executor, company_id, unread_only).await
    }

    /// Grava o alerta de estoque baixo. Quem chama publica depois do commit.
    pub async fn record_low_stock<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        product: &Product,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let message = format!(
            "{} está com {} unidade(s); mínimo configurado: {}.",
            product.name, product.stock_quantity, product.min_stock
        );
        self.repo
            .create_notification(executor, company_id, "Estoque baixo", &message, "low_stock")
            .await
    }

    pub fn publish_created(&self, company_id: Uuid, notifications: &[Notification]) {
        for n in notifications {
            tracing::info!(%company_id, notification_id = %n.id, kind = %n.kind, "Notificação criada");
            self.feed.publish(company_id, NOTIFICATIONS_TABLE, ChangeAction::Insert, Some(n.id));
        }
    }

    pub async fn mark_read<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = self.repo.mark_notification_read(executor, company_id, id).await?;
        self.feed.publish(company_id, NOTIFICATIONS_TABLE, ChangeAction::Update, Some(id));
        Ok(notification)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, company_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = self.repo.mark_all_notifications_read(executor, company_id).await?;
        if updated > 0 {
            self.feed.publish(company_id, NOTIFICATIONS_TABLE, ChangeAction::Update, None);
        }
        Ok(updated)
    }

    pub async fn delete<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.delete_notification(executor, company_id, id).await?;
        self.feed.publish(company_id, NOTIFICATIONS_TABLE, ChangeAction::Delete, Some(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cart::tests::product;
    use rust_decimal::Decimal;

    #[test]
    fn only_the_crossing_movement_alerts() {
        let mut p = product(Decimal::ONE);
        p.min_stock = 5;

        p.stock_quantity = 5;
        assert!(crossed_into_low_stock(6, &p));
        // já estava baixo antes
        assert!(!crossed_into_low_stock(5, &p));

        p.stock_quantity = 6;
        assert!(!crossed_into_low_stock(9, &p));
    }
}

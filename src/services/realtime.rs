// src/services/realtime.rs
//
// Feed de mudanças por empresa. Os serviços publicam depois do commit;
// o painel assina via SSE e refaz as consultas ao receber um evento.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(skip)]
    pub company_id: Uuid,
    pub table: String,
    pub action: ChangeAction,
    pub record_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, company_id: Uuid, table: &str, action: ChangeAction, record_id: Option<Uuid>) {
        let event = ChangeEvent {
            company_id,
            table: table.to_string(),
            action,
            record_id,
            at: Utc::now(),
        };
        // Sem assinantes o envio falha; não é erro.
        if self.sender.send(event).is_err() {
            tracing::debug!(%company_id, table, "Nenhum assinante no feed de mudanças");
        }
    }

    pub fn subscribe(&self, company_id: Uuid) -> TenantSubscription {
        TenantSubscription {
            company_id,
            receiver: self.sender.subscribe(),
        }
    }
}

/// Assinatura filtrada: só entrega eventos da empresa informada.
pub struct TenantSubscription {
    company_id: Uuid,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl TenantSubscription {
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.company_id == self.company_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Assinante lento perde eventos; o painel refaz a consulta no próximo.
                    tracing::warn!(company_id = %self.company_id, skipped, "Assinante do feed atrasado");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_only_sees_its_own_company() {
        let feed = ChangeFeed::new(16);
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        let mut sub_a = feed.subscribe(company_a);

        feed.publish(company_b, "notifications", ChangeAction::Insert, None);
        let record = Uuid::new_v4();
        feed.publish(company_a, "notifications", ChangeAction::Insert, Some(record));

        let event = sub_a.next().await.unwrap();
        assert_eq!(event.company_id, company_a);
        assert_eq!(event.record_id, Some(record));
        assert_eq!(event.table, "notifications");
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ChangeFeed::new(4);
        let mut sub = feed.subscribe(Uuid::new_v4());
        drop(feed);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let feed = ChangeFeed::new(4);
        feed.publish(Uuid::new_v4(), "sales", ChangeAction::Insert, None);
    }
}

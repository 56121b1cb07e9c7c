// src/services/marketing_service.rs
//
// Campanhas de e-mail: rascunho -> agendada -> enviada. Depois de enviada,
// a campanha não muda mais.

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EngagementRepository, PartnerRepository},
    models::engagement::{CampaignStatus, EmailCampaign},
    services::realtime::{ChangeAction, ChangeFeed},
};

const CAMPAIGNS_TABLE: &str = "email_campaigns";

pub fn ensure_editable(campaign: &EmailCampaign) -> Result<(), AppError> {
    if campaign.status == CampaignStatus::Sent {
        return Err(AppError::CampaignLocked);
    }
    Ok(())
}

#[derive(Clone)]
pub struct MarketingService {
    engagement_repo: EngagementRepository,
    partner_repo: PartnerRepository,
    feed: ChangeFeed,
}

impl MarketingService {
    pub fn new(engagement_repo: EngagementRepository, partner_repo: PartnerRepository, feed: ChangeFeed) -> Self {
        Self { engagement_repo, partner_repo, feed }
    }

    pub async fn list_campaigns<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Vec<EmailCampaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.engagement_repo.list_campaigns(executor, company_id).await
    }

    pub async fn get_campaign<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.engagement_repo.get_campaign(executor, company_id, id).await
    }

    pub async fn create_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        name: &str,
        subject: &str,
        content: &str,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = self
            .engagement_repo
            .create_campaign(executor, company_id, name, subject, content)
            .await?;
        self.feed.publish(company_id, CAMPAIGNS_TABLE, ChangeAction::Insert, Some(campaign.id));
        Ok(campaign)
    }

    pub async fn update_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        name: &str,
        subject: &str,
        content: &str,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self.engagement_repo.get_campaign(&mut *tx, company_id, id).await?;
        ensure_editable(&current)?;

        let campaign = self
            .engagement_repo
            .update_campaign_content(&mut *tx, company_id, id, name, subject, content)
            .await?;

        tx.commit().await?;
        self.feed.publish(company_id, CAMPAIGNS_TABLE, ChangeAction::Update, Some(id));
        Ok(campaign)
    }

    pub async fn schedule<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self.engagement_repo.get_campaign(&mut *tx, company_id, id).await?;
        ensure_editable(&current)?;

        let campaign = self
            .engagement_repo
            .set_campaign_status(&mut *tx, company_id, id, CampaignStatus::Scheduled, Some(scheduled_at), None, None)
            .await?;

        tx.commit().await?;
        tracing::info!(%company_id, campaign_id = %id, %scheduled_at, "Campanha agendada");
        self.feed.publish(company_id, CAMPAIGNS_TABLE, ChangeAction::Update, Some(id));
        Ok(campaign)
    }

    /// Marca como enviada. Destinatários = clientes da empresa com e-mail.
    pub async fn mark_sent<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self.engagement_repo.get_campaign(&mut *tx, company_id, id).await?;
        ensure_editable(&current)?;

        let recipients = self.partner_repo.count_clients_with_email(&mut *tx, company_id).await?;
        let recipients = i32::try_from(recipients).unwrap_or(i32::MAX);

        let campaign = self
            .engagement_repo
            .set_campaign_status(
                &mut *tx,
                company_id,
                id,
                CampaignStatus::Sent,
                None,
                Some(Utc::now()),
                Some(recipients),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(%company_id, campaign_id = %id, recipients, "Campanha enviada");
        self.feed.publish(company_id, CAMPAIGNS_TABLE, ChangeAction::Update, Some(id));
        Ok(campaign)
    }

    pub async fn delete_campaign<'e, E>(&self, executor: E, company_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.engagement_repo.delete_campaign(executor, company_id, id).await?;
        self.feed.publish(company_id, CAMPAIGNS_TABLE, ChangeAction::Delete, Some(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(status: CampaignStatus) -> EmailCampaign {
        EmailCampaign {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Promoção".into(),
            subject: "Só hoje".into(),
            content: "<p>10% off</p>".into(),
            status,
            scheduled_at: None,
            sent_at: None,
            recipients_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sent_campaigns_are_locked() {
        assert!(ensure_editable(&campaign(CampaignStatus::Draft)).is_ok());
        assert!(ensure_editable(&campaign(CampaignStatus::Scheduled)).is_ok());
        assert!(matches!(
            ensure_editable(&campaign(CampaignStatus::Sent)),
            Err(AppError::CampaignLocked)
        ));
    }
}

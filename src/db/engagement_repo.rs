// src/db/engagement_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::engagement::{CallDirection, CallRecord, CampaignStatus, EmailCampaign, Notification},
};

#[derive(Clone, Default)]
pub struct EngagementRepository;

impl EngagementRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CAMPANHAS DE E-MAIL
    // =========================================================================

    pub async fn list_campaigns<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<EmailCampaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaigns = sqlx::query_as::<_, EmailCampaign>(
            "SELECT * FROM email_campaigns WHERE company_id = $1 ORDER BY created_at DESC",
        )
            .bind(company_id)
            .fetch_all(executor)
            .await?;
        Ok(campaigns)
    }

    pub async fn get_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, EmailCampaign>(
            "SELECT * FROM email_campaigns WHERE id = $1 AND company_id = $2",
        )
            .bind(campaign_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("campaign"))
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
        let campaign = sqlx::query_as::<_, EmailCampaign>(
            r#"
            INSERT INTO email_campaigns (company_id, name, subject, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(name)
            .bind(subject)
            .bind(content)
            .fetch_one(executor)
            .await?;
        Ok(campaign)
    }

    pub async fn update_campaign_content<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
        name: &str,
        subject: &str,
        content: &str,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, EmailCampaign>(
            r#"
            UPDATE email_campaigns SET name = $3, subject = $4, content = $5, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(campaign_id)
            .bind(company_id)
            .bind(name)
            .bind(subject)
            .bind(content)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("campaign"))
    }

    pub async fn set_campaign_status<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
        status: CampaignStatus,
        scheduled_at: Option<DateTime<Utc>>,
        sent_at: Option<DateTime<Utc>>,
        recipients_count: Option<i32>,
    ) -> Result<EmailCampaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, EmailCampaign>(
            r#"
            UPDATE email_campaigns SET
                status = $3,
                scheduled_at = COALESCE($4, scheduled_at),
                sent_at = COALESCE($5, sent_at),
                recipients_count = COALESCE($6, recipients_count),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(campaign_id)
            .bind(company_id)
            .bind(status)
            .bind(scheduled_at)
            .bind(sent_at)
            .bind(recipients_count)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("campaign"))
    }

    pub async fn delete_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM email_campaigns WHERE id = $1 AND company_id = $2")
            .bind(campaign_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("campaign"));
        }
        Ok(())
    }

    // =========================================================================
    //  LIGAÇÕES
    // =========================================================================

    pub async fn list_calls<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<Vec<CallRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let calls = sqlx::query_as::<_, CallRecord>(
            r#"
            SELECT * FROM call_records
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR client_id = $2)
            ORDER BY called_at DESC
            "#,
        )
            .bind(company_id)
            .bind(client_id)
            .fetch_all(executor)
            .await?;
        Ok(calls)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_call<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        client_id: Option<Uuid>,
        phone_number: &str,
        direction: CallDirection,
        duration_seconds: i32,
        outcome: Option<&str>,
        notes: Option<&str>,
        called_at: Option<DateTime<Utc>>,
    ) -> Result<CallRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let call = sqlx::query_as::<_, CallRecord>(
            r#"
            INSERT INTO call_records (
                company_id, client_id, phone_number, direction,
                duration_seconds, outcome, notes, called_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(client_id)
            .bind(phone_number)
            .bind(direction)
            .bind(duration_seconds)
            .bind(outcome)
            .bind(notes)
            .bind(called_at)
            .fetch_one(executor)
            .await?;
        Ok(call)
    }

    pub async fn delete_call<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        call_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM call_records WHERE id = $1 AND company_id = $2")
            .bind(call_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("call"));
        }
        Ok(())
    }

    // =========================================================================
    //  NOTIFICAÇÕES
    // =========================================================================

    pub async fn list_notifications<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE company_id = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT 100
            "#,
        )
            .bind(company_id)
            .bind(unread_only)
            .fetch_all(executor)
            .await?;
        Ok(notifications)
    }

    pub async fn create_notification<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (company_id, title, message, kind)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
            .bind(company_id)
            .bind(title)
            .bind(message)
            .bind(kind)
            .fetch_one(executor)
            .await?;
        Ok(notification)
    }

    pub async fn mark_notification_read<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
            .bind(notification_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("notification"))
    }

    pub async fn mark_all_notifications_read<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE company_id = $1 AND read = FALSE",
        )
            .bind(company_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_notification<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        notification_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND company_id = $2")
            .bind(notification_id)
            .bind(company_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("notification"));
        }
        Ok(())
    }
}

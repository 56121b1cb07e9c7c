// src/handlers/marketing.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::engagement::EmailCampaign,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Promoção de Natal")]
    pub name: String,
    #[validate(length(min = 1, message = "O assunto é obrigatório."))]
    pub subject: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCampaignPayload {
    pub scheduled_at: DateTime<Utc>,
}

// GET /api/marketing/campaigns
#[utoipa::path(
    get,
    path = "/api/marketing/campaigns",
    tag = "Marketing",
    responses((status = 200, description = "Campanhas de e-mail", body = Vec<EmailCampaign>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaigns = app_state
        .marketing_service
        .list_campaigns(&mut *rls_conn, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaigns)))
}

// GET /api/marketing/campaigns/{id}
pub async fn get_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .marketing_service
        .get_campaign(&mut *rls_conn, tenant.0, campaign_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// POST /api/marketing/campaigns
#[utoipa::path(
    post,
    path = "/api/marketing/campaigns",
    tag = "Marketing",
    request_body = CampaignPayload,
    responses((status = 201, description = "Campanha criada como rascunho", body = EmailCampaign)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .marketing_service
        .create_campaign(&mut *rls_conn, tenant.0, payload.name.trim(), payload.subject.trim(), &payload.content)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

// PUT /api/marketing/campaigns/{id}
#[utoipa::path(
    put,
    path = "/api/marketing/campaigns/{id}",
    tag = "Marketing",
    request_body = CampaignPayload,
    responses(
        (status = 200, description = "Campanha atualizada", body = EmailCampaign),
        (status = 409, description = "Campanha já enviada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da campanha")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<CampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .marketing_service
        .update_campaign(
            &mut *rls_conn,
            tenant.0,
            campaign_id,
            payload.name.trim(),
            payload.subject.trim(),
            &payload.content,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// POST /api/marketing/campaigns/{id}/schedule
#[utoipa::path(
    post,
    path = "/api/marketing/campaigns/{id}/schedule",
    tag = "Marketing",
    request_body = ScheduleCampaignPayload,
    responses(
        (status = 200, description = "Campanha agendada", body = EmailCampaign),
        (status = 409, description = "Campanha já enviada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da campanha")
    ),
    security(("api_jwt" = []))
)]
pub async fn schedule_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<ScheduleCampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .marketing_service
        .schedule(&mut *rls_conn, tenant.0, campaign_id, payload.scheduled_at)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// POST /api/marketing/campaigns/{id}/send
#[utoipa::path(
    post,
    path = "/api/marketing/campaigns/{id}/send",
    tag = "Marketing",
    responses(
        (status = 200, description = "Campanha marcada como enviada", body = EmailCampaign),
        (status = 409, description = "Campanha já enviada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("id" = Uuid, Path, description = "ID da campanha")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .marketing_service
        .mark_sent(&mut *rls_conn, tenant.0, campaign_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// DELETE /api/marketing/campaigns/{id}
pub async fn delete_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .marketing_service
        .delete_campaign(&mut *rls_conn, tenant.0, campaign_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

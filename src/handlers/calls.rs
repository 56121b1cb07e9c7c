// src/handlers/calls.rs
//
// Registro de ligações com clientes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::engagement::{CallDirection, CallRecord},
    services::realtime::ChangeAction,
};

const CALLS_TABLE: &str = "call_records";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    pub client_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    #[schema(example = "(11) 99999-8888")]
    pub phone_number: String,

    pub direction: CallDirection,

    #[serde(default)]
    #[validate(range(min = 0, message = "A duração não pode ser negativa."))]
    pub duration_seconds: i32,

    pub outcome: Option<String>,
    pub notes: Option<String>,

    // Ausente: agora
    pub called_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct CallsQuery {
    /// Só as ligações deste cliente
    pub client_id: Option<Uuid>,
}

// GET /api/calls
#[utoipa::path(
    get,
    path = "/api/calls",
    tag = "Calls",
    responses((status = 200, description = "Ligações, mais recentes primeiro", body = Vec<CallRecord>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), CallsQuery),
    security(("api_jwt" = []))
)]
pub async fn list_calls(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<CallsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let calls = app_state
        .engagement_repo
        .list_calls(&mut *rls_conn, tenant.0, query.client_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(calls)))
}

// POST /api/calls
#[utoipa::path(
    post,
    path = "/api/calls",
    tag = "Calls",
    request_body = CallPayload,
    responses(
        (status = 201, description = "Ligação registrada", body = CallRecord),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_call(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CallPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if let Some(client_id) = payload.client_id {
        app_state
            .partner_repo
            .get_client(&mut *rls_conn, tenant.0, client_id)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    }

    let outcome = payload.outcome.as_deref().map(str::trim).filter(|o| !o.is_empty());
    let notes = payload.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let call = app_state
        .engagement_repo
        .create_call(
            &mut *rls_conn,
            tenant.0,
            payload.client_id,
            payload.phone_number.trim(),
            payload.direction,
            payload.duration_seconds,
            outcome,
            notes,
            payload.called_at,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, CALLS_TABLE, ChangeAction::Insert, Some(call.id));
    Ok((StatusCode::CREATED, Json(call)))
}

// DELETE /api/calls/{id}
pub async fn delete_call(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(call_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .engagement_repo
        .delete_call(&mut *rls_conn, tenant.0, call_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, CALLS_TABLE, ChangeAction::Delete, Some(call_id));
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_defaults_duration_and_rejects_negative() {
        let payload: CallPayload = serde_json::from_value(json!({
            "phoneNumber": "11 4000-1000",
            "direction": "outbound"
        }))
        .unwrap();
        assert_eq!(payload.duration_seconds, 0);
        assert!(payload.validate().is_ok());

        let negative: CallPayload = serde_json::from_value(json!({
            "phoneNumber": "11 4000-1000",
            "direction": "inbound",
            "durationSeconds": -5
        }))
        .unwrap();
        assert!(negative.validate().is_err());
    }
}

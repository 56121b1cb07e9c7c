// src/handlers/settings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::settings::{SystemSetting, UpdateSettingRequest},
    services::realtime::ChangeAction,
};

const SETTINGS_TABLE: &str = "system_settings";
const MAX_KEY_LEN: usize = 64;

// Chaves em snake_case: letras minúsculas, dígitos e "_"
fn validate_setting_key(key: &str) -> Result<(), ValidationError> {
    let well_formed = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !well_formed {
        let mut err = ValidationError::new("setting_key");
        err.message = Some("Chave de configuração inválida.".into());
        return Err(err);
    }
    Ok(())
}

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses((status = 200, description = "Configurações da loja, por chave", body = Vec<SystemSetting>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let settings = app_state
        .settings_repo
        .list_settings(&mut *rls_conn, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings/{key}
#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    tag = "Settings",
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Configuração gravada", body = SystemSetting),
        (status = 400, description = "Chave inválida")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("key" = String, Path, description = "Chave da configuração, ex.: receipt_footer")
    ),
    security(("api_jwt" = []))
)]
pub async fn upsert_setting(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(err) = validate_setting_key(&key) {
        let mut errors = validator::ValidationErrors::new();
        errors.add("key", err);
        return Err(AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store));
    }

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let setting = app_state
        .settings_repo
        .upsert_setting(&mut *rls_conn, tenant.0, &key, &payload.value)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!(company_id = %tenant.0, key = %setting.key, "Configuração gravada");
    app_state
        .change_feed
        .publish(tenant.0, SETTINGS_TABLE, ChangeAction::Update, None);
    Ok((StatusCode::OK, Json(setting)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_keys_are_snake_case() {
        assert!(validate_setting_key("receipt_footer").is_ok());
        assert!(validate_setting_key("store_profile_2").is_ok());
        assert!(validate_setting_key("").is_err());
        assert!(validate_setting_key("Receipt Footer").is_err());
        assert!(validate_setting_key("a-b").is_err());
        assert!(validate_setting_key(&"k".repeat(65)).is_err());
    }
}

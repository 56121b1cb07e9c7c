// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::dashboard::{DailySales, StockValueReport},
};

const DEFAULT_WINDOW_DAYS: u32 = 7;
const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Tamanho da janela em dias (padrão 7)
    pub days: Option<u32>,
}

impl WindowQuery {
    fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_WINDOW_DAYS).min(MAX_WINDOW_DAYS)
    }
}

// GET /api/reports/sales-window?days=N
#[utoipa::path(
    get,
    path = "/api/reports/sales-window",
    tag = "Reports",
    responses((status = 200, description = "Um balde por dia, do mais antigo a hoje", body = Vec<DailySales>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), WindowQuery),
    security(("api_jwt" = []))
)]
pub async fn sales_window(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let buckets = app_state
        .report_service
        .sales_window(&mut *rls_conn, tenant.0, query.days(), Utc::now().date_naive())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(buckets)))
}

// GET /api/reports/payment-methods?days=N
#[utoipa::path(
    get,
    path = "/api/reports/payment-methods",
    tag = "Reports",
    responses((status = 200, description = "Quantidade de vendas por forma de pagamento", body = std::collections::BTreeMap<String, u64>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), WindowQuery),
    security(("api_jwt" = []))
)]
pub async fn payment_methods(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let breakdown = app_state
        .report_service
        .payment_breakdown(&mut *rls_conn, tenant.0, query.days())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(breakdown)))
}

// GET /api/reports/stock-value
#[utoipa::path(
    get,
    path = "/api/reports/stock-value",
    tag = "Reports",
    responses((status = 200, description = "Valor total do estoque ativo", body = StockValueReport)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn stock_value(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .stock_value(&mut *rls_conn, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_and_caps() {
        assert_eq!(WindowQuery { days: None }.days(), 7);
        assert_eq!(WindowQuery { days: Some(30) }.days(), 30);
        assert_eq!(WindowQuery { days: Some(10_000) }.days(), 366);
    }
}

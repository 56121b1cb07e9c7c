// src/handlers/partners.rs
//
// Clientes (CRM) e fornecedores.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
    models::partners::{Client, ClientInput, Supplier, SupplierInput},
    services::realtime::ChangeAction,
};

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---
// Clientes
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "João Pereira")]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<ClientPayload> for ClientInput {
    fn from(p: ClientPayload) -> Self {
        ClientInput {
            name: p.name.trim().to_string(),
            email: non_blank(p.email),
            phone: non_blank(p.phone),
            document: non_blank(p.document),
            address: non_blank(p.address),
            notes: non_blank(p.notes),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClientSearchQuery {
    /// Filtro por nome, e-mail, telefone ou documento
    pub search: Option<String>,
}

// GET /api/crm/clients
#[utoipa::path(
    get,
    path = "/api/crm/clients",
    tag = "CRM",
    responses((status = 200, description = "Clientes da loja", body = Vec<Client>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja"), ClientSearchQuery),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<ClientSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let search = non_blank(query.search);
    let clients = app_state
        .partner_repo
        .list_clients(&mut *rls_conn, tenant.0, search.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(clients)))
}

// GET /api/crm/clients/{id}
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .partner_repo
        .get_client(&mut *rls_conn, tenant.0, client_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(client)))
}

// POST /api/crm/clients
#[utoipa::path(
    post,
    path = "/api/crm/clients",
    tag = "CRM",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 400, description = "Dados inválidos")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .partner_repo
        .create_client(&mut *rls_conn, tenant.0, &payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "clients", ChangeAction::Insert, Some(client.id));
    Ok((StatusCode::CREATED, Json(client)))
}

// PUT /api/crm/clients/{id}
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let client = app_state
        .partner_repo
        .update_client(&mut *rls_conn, tenant.0, client_id, &payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "clients", ChangeAction::Update, Some(client_id));
    Ok((StatusCode::OK, Json(client)))
}

// DELETE /api/crm/clients/{id}
pub async fn delete_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .partner_repo
        .delete_client(&mut *rls_conn, tenant.0, client_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "clients", ChangeAction::Delete, Some(client_id));
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Fornecedores
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Distribuidora Central")]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<SupplierPayload> for SupplierInput {
    fn from(p: SupplierPayload) -> Self {
        SupplierInput {
            name: p.name.trim().to_string(),
            contact_name: non_blank(p.contact_name),
            email: non_blank(p.email),
            phone: non_blank(p.phone),
            address: non_blank(p.address),
            notes: non_blank(p.notes),
        }
    }
}

// GET /api/suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "Suppliers",
    responses((status = 200, description = "Fornecedores da loja", body = Vec<Supplier>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_suppliers(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let suppliers = app_state
        .partner_repo
        .list_suppliers(&mut *rls_conn, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(suppliers)))
}

// POST /api/suppliers
#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "Suppliers",
    request_body = SupplierPayload,
    responses((status = 201, description = "Fornecedor criado", body = Supplier)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<SupplierPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let supplier = app_state
        .partner_repo
        .create_supplier(&mut *rls_conn, tenant.0, &payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "suppliers", ChangeAction::Insert, Some(supplier.id));
    Ok((StatusCode::CREATED, Json(supplier)))
}

// PUT /api/suppliers/{id}
pub async fn update_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<SupplierPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let supplier = app_state
        .partner_repo
        .update_supplier(&mut *rls_conn, tenant.0, supplier_id, &payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "suppliers", ChangeAction::Update, Some(supplier_id));
    Ok((StatusCode::OK, Json(supplier)))
}

// DELETE /api/suppliers/{id}
pub async fn delete_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .partner_repo
        .delete_supplier(&mut *rls_conn, tenant.0, supplier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .change_feed
        .publish(tenant.0, "suppliers", ChangeAction::Delete, Some(supplier_id));
    Ok(StatusCode::NO_CONTENT)
}

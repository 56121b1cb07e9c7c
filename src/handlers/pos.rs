// src/handlers/pos.rs
//
// Caixa (PDV): o carrinho vive em memória por (empresa, usuário) e só vira
// venda no checkout.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::sales::{PaymentMethod, Sale},
    services::pos_service::{CartView, RegisterKey},
};

fn register_key(tenant: &TenantContext, user: &AuthenticatedUser) -> RegisterKey {
    RegisterKey {
        company_id: tenant.0,
        user_id: user.0.id,
    }
}

fn validate_percent(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("O desconto deve estar entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemPayload {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemPayload {
    /// Zero ou negativo remove o item
    #[schema(example = 3)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscountPayload {
    #[validate(custom(function = "validate_percent"))]
    #[schema(value_type = f64, example = 10)]
    pub discount_percent: Decimal,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub client_id: Option<Uuid>,
    /// Ausente ou desconhecida vira "cash"
    #[schema(example = "pix")]
    pub payment_method: Option<String>,
}

// ---
// Handlers
// ---

// GET /api/pos/cart
#[utoipa::path(
    get,
    path = "/api/pos/cart",
    tag = "POS",
    responses((status = 200, description = "Carrinho atual com totais", body = CartView)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Json<CartView> {
    Json(app_state.cart_registry.view(register_key(&tenant, &user)))
}

// DELETE /api/pos/cart
pub async fn clear_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .cart_registry
        .clear(register_key(&tenant, &user))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/pos/cart/items
#[utoipa::path(
    post,
    path = "/api/pos/cart/items",
    tag = "POS",
    request_body = AddCartItemPayload,
    responses(
        (status = 200, description = "Item adicionado (ou +1 se já estava no carrinho)", body = CartView),
        (status = 404, description = "Produto inexistente ou inativo"),
        (status = 409, description = "Finalização em andamento")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<AddCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .get_product(&mut *rls_conn, tenant.0, payload.product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Produto inativo não aparece no PDV
    if !product.is_active() {
        return Err(AppError::NotFound("product").to_api_error(&locale, &app_state.i18n_store));
    }

    let view = app_state
        .cart_registry
        .add_item(register_key(&tenant, &user), &product)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}

// PUT /api/pos/cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/api/pos/cart/items/{product_id}",
    tag = "POS",
    request_body = UpdateCartItemPayload,
    responses((status = 200, description = "Quantidade alterada", body = CartView)),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja"),
        ("product_id" = Uuid, Path, description = "Produto no carrinho")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .cart_registry
        .update_quantity(register_key(&tenant, &user), product_id, payload.quantity)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}

// DELETE /api/pos/cart/items/{product_id}
pub async fn remove_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = app_state
        .cart_registry
        .remove_item(register_key(&tenant, &user), product_id)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}

// PUT /api/pos/cart/discount
#[utoipa::path(
    put,
    path = "/api/pos/cart/discount",
    tag = "POS",
    request_body = SetDiscountPayload,
    responses(
        (status = 200, description = "Desconto aplicado", body = CartView),
        (status = 400, description = "Desconto fora de 0..100")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn set_discount(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<SetDiscountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let view = app_state
        .cart_registry
        .set_discount(register_key(&tenant, &user), payload.discount_percent)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(view)))
}

// POST /api/pos/checkout
#[utoipa::path(
    post,
    path = "/api/pos/checkout",
    tag = "POS",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Venda registrada; carrinho esvaziado", body = Sale),
        (status = 400, description = "Carrinho vazio"),
        (status = 409, description = "Estoque insuficiente ou finalização já em andamento")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn checkout(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    payload: Option<Json<CheckoutPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    if let Some(client_id) = payload.client_id {
        let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        app_state
            .partner_repo
            .get_client(&mut *rls_conn, tenant.0, client_id)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    }

    let sale = app_state
        .cart_registry
        .checkout(
            register_key(&tenant, &user),
            app_state.sales_service.clone(),
            payload.client_id,
            PaymentMethod::from_label(payload.payment_method.as_deref()),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(sale)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_payload_accepts_only_zero_to_hundred() {
        let ok = |v: i64| SetDiscountPayload { discount_percent: Decimal::from(v) }.validate().is_ok();
        assert!(ok(0));
        assert!(ok(10));
        assert!(ok(100));
        assert!(!ok(-1));
        assert!(!ok(150));
    }
}

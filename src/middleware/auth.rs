// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::auth::User,
};

const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Token do cabeçalho `Authorization: Bearer <jwt>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn tenant_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

// Os guardas rodam antes do extrator de idioma: o Locale é lido aqui mesmo.
fn reject(err: AppError, headers: &HeaderMap, app_state: &AppState) -> ApiError {
    let locale = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(Locale::from_header)
        .unwrap_or_default();
    err.to_api_error(&locale, &app_state.i18n_store)
}

async fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(token).await
}

// ---
// Guarda 1: só autenticação (rotas de usuário)
// ---
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, request.headers())
        .await
        .map_err(|e| reject(e, request.headers(), &app_state))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// ---
// Guarda 2: autenticação + empresa (rotas com x-tenant-id)
// ---
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, request.headers())
        .await
        .map_err(|e| reject(e, request.headers(), &app_state))?;

    let company_id = tenant_id(request.headers())
        .ok_or_else(|| reject(AppError::MissingTenantContext, request.headers(), &app_state))?;

    let is_member = app_state
        .company_repo
        .is_member(user.id, company_id)
        .await
        .map_err(|e| reject(e, request.headers(), &app_state))?;

    if !is_member {
        tracing::warn!(user_id = %user.id, %company_id, "Acesso negado à empresa");
        return Err(reject(AppError::TenantAccessDenied, request.headers(), &app_state));
    }

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(TenantContext(company_id));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn tenant_header_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(tenant_id(&headers).is_none());

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert!(tenant_id(&headers).is_none());

        let id = Uuid::new_v4();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(tenant_id(&headers), Some(id));
    }
}

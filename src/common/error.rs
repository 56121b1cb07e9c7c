// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// O erro interno da aplicação. Serviços e repositórios só conhecem este tipo;
// a conversão para HTTP (e para o idioma do usuário) acontece no handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // A sessão chegou sem empresa selecionada (cabeçalho x-tenant-id ausente ou inválido)
    #[error("Contexto de empresa ausente")]
    MissingTenantContext,

    #[error("Usuário sem acesso à empresa")]
    TenantAccessDenied,

    #[error("Registro não encontrado: {0}")]
    NotFound(&'static str),

    #[error("SKU já existe")]
    SkuAlreadyExists,

    #[error("Nome de categoria já existe: {0}")]
    CategoryNameAlreadyExists(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Exclusão barrada por outro registro que ainda aponta para este
    #[error("Registro em uso: {0}")]
    RecordInUse(String),

    #[error("Referência inválida: {0}")]
    InvalidReference(String),

    #[error("Estoque insuficiente")]
    InsufficientStock,

    #[error("Carrinho vazio")]
    EmptyCart,

    #[error("Finalização de venda já em andamento")]
    CheckoutInProgress,

    #[error("Campanha já enviada")]
    CampaignLocked,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro "de fronteira": já tem status, mensagem traduzida e detalhes.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl AppError {
    /// Status HTTP e chave de tradução de cada variante.
    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "error.validation"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "error.email_already_exists"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "error.invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "error.invalid_token"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "error.user_not_found"),
            AppError::MissingTenantContext => (StatusCode::UNAUTHORIZED, "error.missing_tenant"),
            AppError::TenantAccessDenied => (StatusCode::FORBIDDEN, "error.tenant_access_denied"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "error.not_found"),
            AppError::SkuAlreadyExists => (StatusCode::CONFLICT, "error.sku_already_exists"),
            AppError::CategoryNameAlreadyExists(_) => (StatusCode::CONFLICT, "error.category_already_exists"),
            AppError::UniqueConstraintViolation(_) => (StatusCode::CONFLICT, "error.unique_violation"),
            AppError::RecordInUse(_) => (StatusCode::CONFLICT, "error.record_in_use"),
            AppError::InvalidReference(_) => (StatusCode::BAD_REQUEST, "error.invalid_reference"),
            AppError::InsufficientStock => (StatusCode::CONFLICT, "error.insufficient_stock"),
            AppError::EmptyCart => (StatusCode::BAD_REQUEST, "error.empty_cart"),
            AppError::CheckoutInProgress => (StatusCode::CONFLICT, "error.checkout_in_progress"),
            AppError::CampaignLocked => (StatusCode::CONFLICT, "error.campaign_locked"),
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error.internal"),
        }
    }

    /// Argumento interpolado em `{0}` na mensagem traduzida.
    fn message_arg(&self) -> Option<&str> {
        match self {
            AppError::NotFound(entity) => Some(entity),
            AppError::CategoryNameAlreadyExists(name) => Some(name),
            AppError::UniqueConstraintViolation(constraint)
            | AppError::RecordInUse(constraint)
            | AppError::InvalidReference(constraint) => Some(constraint),
            _ => None,
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key) = self.status_and_key();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe técnico fica só no log; o cliente recebe a mensagem genérica.
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let mut message = store.translate(&locale.0, key);
        if let Some(arg) = self.message_arg() {
            message = message.replace("{0}", arg);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(details)
            }
            _ => None,
        };

        ApiError { status, error: message, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Usado pelos middlewares, que rodam antes do extrator de idioma.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::shared())
            .into_response()
    }
}

/// Converte violações de CHECK/UNIQUE/FK do Postgres nas variantes de domínio.
pub(crate) fn map_constraint_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        if db_err.is_check_violation() && constraint.contains("stock_quantity") {
            return AppError::InsufficientStock;
        }
        if db_err.is_unique_violation() {
            if constraint.contains("sku") {
                return AppError::SkuAlreadyExists;
            }
            return AppError::UniqueConstraintViolation(constraint);
        }
        // Inserção apontando para um registro que não existe (mais)
        if db_err.is_foreign_key_violation() {
            return AppError::InvalidReference(constraint);
        }
    }
    e.into()
}

/// Como `map_constraint_error`, mas num DELETE a FK violada significa que
/// outro registro ainda depende deste (ex.: produto com vendas).
pub(crate) fn map_delete_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return AppError::RecordInUse(db_err.constraint().unwrap_or_default().to_string());
        }
    }
    map_constraint_error(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};
    use validator::{ValidationError, ValidationErrors};

    // Erro do Postgres montado à mão: só SQLSTATE e constraint importam aqui
    #[derive(Debug)]
    struct PgViolation {
        sqlstate: &'static str,
        constraint: &'static str,
    }

    impl fmt::Display for PgViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "violação em {}", self.constraint)
        }
    }

    impl StdError for PgViolation {}

    impl DatabaseError for PgViolation {
        fn message(&self) -> &str {
            "violação simulada"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.sqlstate))
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.sqlstate {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn violation(sqlstate: &'static str, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgViolation { sqlstate, constraint }))
    }

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn missing_tenant_asks_to_sign_in_again() {
        let api = AppError::MissingTenantContext.to_api_error(&Locale::default(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert!(api.error.to_lowercase().contains("sign in"));
    }

    #[test]
    fn not_found_interpolates_entity_name() {
        let api = AppError::NotFound("product").to_api_error(&Locale::default(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.error.contains("product"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("range");
        err.message = Some("O preço deve ser maior que zero.".into());
        errors.add("price", err);

        let api = AppError::ValidationError(errors).to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(details["price"], vec!["O preço deve ser maior que zero.".to_string()]);
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let api = AppError::InternalServerError(anyhow::anyhow!("pool exhausted"))
            .to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("pool"));
    }

    #[test]
    fn pos_errors_map_to_client_statuses() {
        let store = I18nStore::shared();
        assert_eq!(AppError::EmptyCart.to_api_error(&pt(), store).status, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::CheckoutInProgress.to_api_error(&pt(), store).status, StatusCode::CONFLICT);
        assert_eq!(AppError::InsufficientStock.to_api_error(&pt(), store).status, StatusCode::CONFLICT);
    }

    #[test]
    fn deleting_a_referenced_row_is_a_conflict() {
        let err = map_delete_error(violation("23503", "sale_items_product_id_fkey"));
        assert!(matches!(&err, AppError::RecordInUse(c) if c == "sale_items_product_id_fkey"));

        let api = err.to_api_error(&pt(), I18nStore::shared());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("sale_items_product_id_fkey"));
    }

    #[test]
    fn inserting_a_dangling_reference_is_a_bad_request() {
        let err = map_constraint_error(violation("23503", "sale_items_product_id_fkey"));
        assert!(matches!(err, AppError::InvalidReference(_)));
        assert_eq!(
            err.to_api_error(&Locale::default(), I18nStore::shared()).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn delete_mapping_falls_back_to_constraint_mapping() {
        assert!(matches!(
            map_delete_error(violation("23505", "products_company_sku_key")),
            AppError::SkuAlreadyExists
        ));
        assert!(matches!(
            map_delete_error(violation("23514", "products_stock_quantity_check")),
            AppError::InsufficientStock
        ));
        assert!(matches!(map_delete_error(sqlx::Error::RowNotFound), AppError::DatabaseError(_)));
    }
}

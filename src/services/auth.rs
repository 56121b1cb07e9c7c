// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CompanyRepository, UserRepository},
    models::auth::{AuthResponse, Claims, User},
};

const OWNER_ROLE: &str = "owner";

// ---
// Tokens
// ---

/// `jti` revogados no logout, guardados até a data de expiração do token.
#[derive(Default)]
pub struct RevokedTokens {
    entries: DashMap<Uuid, usize>,
}

impl RevokedTokens {
    pub fn revoke(&self, jti: Uuid, exp: usize) {
        self.entries.insert(jti, exp);
        self.prune(Utc::now().timestamp() as usize);
    }

    pub fn is_revoked(&self, jti: &Uuid) -> bool {
        self.entries.contains_key(jti)
    }

    /// Descarta o que já expirou: o próprio JWT passa a ser recusado.
    pub fn prune(&self, now: usize) {
        self.entries.retain(|_, exp| *exp > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl_days: i64,
    revoked: Arc<RevokedTokens>,
}

impl TokenIssuer {
    pub fn new(secret: String, ttl_days: i64) -> Self {
        Self {
            secret,
            ttl_days,
            revoked: Arc::new(RevokedTokens::default()),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.ttl_days);

        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?)
    }

    /// Assinatura, expiração e lista de revogados.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
            .map_err(|_| AppError::InvalidToken)?
            .claims;

        if self.revoked.is_revoked(&claims.jti) {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    pub fn revoke(&self, token: &str) -> Result<(), AppError> {
        let claims = self.decode(token)?;
        self.revoked.revoke(claims.jti, claims.exp);
        Ok(())
    }
}

// ---
// Serviço
// ---

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    company_repo: CompanyRepository,
    tokens: TokenIssuer,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, company_repo: CompanyRepository, tokens: TokenIssuer, pool: PgPool) -> Self {
        Self { user_repo, company_repo, tokens, pool }
    }

    /// Cria usuário, empresa e vínculo de dono numa única transação.
    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        company_name: &str,
    ) -> Result<AuthResponse, AppError> {
        // Hash fora da transação: não toca no banco
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let mut tx = self.pool.begin().await?;

        let user = self
            .user_repo
            .create_user(&mut *tx, &email.trim().to_lowercase(), full_name.trim(), &hashed_password)
            .await?;
        let company = self.company_repo.create_company(&mut *tx, company_name.trim()).await?;
        self.company_repo
            .add_member(&mut *tx, user.id, company.id, OWNER_ROLE)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, company_id = %company.id, "Novo usuário registrado");
        self.respond_for(user.id).await
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!(user_id = %user.id, "Tentativa de login com senha incorreta");
            return Err(AppError::InvalidCredentials);
        }

        self.respond_for(user.id).await
    }

    pub fn logout(&self, token: &str) -> Result<(), AppError> {
        self.tokens.revoke(token)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.tokens.decode(token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn respond_for(&self, user_id: Uuid) -> Result<AuthResponse, AppError> {
        let token = self.tokens.issue(user_id)?;
        let companies = self.company_repo.list_user_companies(user_id).await?;
        Ok(AuthResponse { token, companies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("segredo-de-teste".into(), 7)
    }

    #[test]
    fn issued_token_decodes_to_same_user() {
        let tokens = issuer();
        let user_id = Uuid::new_v4();

        let claims = tokens.decode(&tokens.issue(user_id).unwrap()).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn every_token_gets_its_own_jti() {
        let tokens = issuer();
        let user_id = Uuid::new_v4();
        let a = tokens.decode(&tokens.issue(user_id).unwrap()).unwrap();
        let b = tokens.decode(&tokens.issue(user_id).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn revoked_token_is_rejected_but_others_survive() {
        let tokens = issuer();
        let user_id = Uuid::new_v4();
        let first = tokens.issue(user_id).unwrap();
        let second = tokens.issue(user_id).unwrap();

        tokens.revoke(&first).unwrap();

        assert!(matches!(tokens.decode(&first), Err(AppError::InvalidToken)));
        assert!(tokens.decode(&second).is_ok());
        // revogar de novo falha: o token já não é válido
        assert!(tokens.revoke(&first).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenIssuer::new("outro-segredo".into(), 7);
        let token = other.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(issuer().decode(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenIssuer::new("segredo-de-teste".into(), -1);
        let token = tokens.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(tokens.decode(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn prune_drops_expired_entries() {
        let revoked = RevokedTokens::default();
        revoked.entries.insert(Uuid::new_v4(), 100);
        revoked.entries.insert(Uuid::new_v4(), 300);

        revoked.prune(200);

        assert_eq!(revoked.len(), 1);
    }
}

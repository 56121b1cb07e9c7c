// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        CatalogRepository, CompanyRepository, DashboardRepository, EngagementRepository, InventoryRepository,
        PartnerRepository, SalesRepository, SettingsRepository, UserRepository,
    },
    services::{
        auth::{AuthService, TokenIssuer},
        catalog_service::CatalogService,
        dashboard_service::DashboardService,
        inventory_service::InventoryService,
        marketing_service::MarketingService,
        notification_service::NotificationService,
        pos_service::CartRegistry,
        realtime::ChangeFeed,
        report_service::ReportService,
        sales_service::SalesService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_JWT_TTL_DAYS: i64 = 7;
const CHANGE_FEED_CAPACITY: usize = 256;

// ---
// Configuração (variáveis de ambiente)
// ---

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub jwt_ttl_days: i64,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    /// Lê o `.env` (se existir) e o ambiente do processo.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {}", v))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let jwt_ttl_days = match lookup("JWT_TTL_DAYS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("JWT_TTL_DAYS inválido: {}", v))?,
            None => DEFAULT_JWT_TTL_DAYS,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            db_max_connections,
            jwt_ttl_days,
            cors_origin: lookup("CORS_ORIGIN").filter(|v| !v.trim().is_empty()),
        })
    }
}

// ---
// Estado compartilhado
// ---

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub company_repo: CompanyRepository,
    pub catalog_service: CatalogService,
    pub partner_repo: PartnerRepository,
    pub inventory_service: InventoryService,
    pub sales_service: Arc<SalesService>,
    pub cart_registry: Arc<CartRegistry>,
    pub report_service: ReportService,
    pub dashboard_service: DashboardService,
    pub marketing_service: MarketingService,
    pub engagement_repo: EngagementRepository,
    pub notification_service: NotificationService,
    pub settings_repo: SettingsRepository,
    pub change_feed: ChangeFeed,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::load()?);

        Ok(Self::build(db_pool, config, i18n_store))
    }

    /// Monta o grafo de dependências sobre um pool já criado.
    pub fn build(db_pool: PgPool, config: AppConfig, i18n_store: Arc<I18nStore>) -> Self {
        let change_feed = ChangeFeed::new(CHANGE_FEED_CAPACITY);

        let user_repo = UserRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new();
        let partner_repo = PartnerRepository::new();
        let inventory_repo = InventoryRepository::new();
        let sales_repo = SalesRepository::new();
        let engagement_repo = EngagementRepository::new();

        let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.jwt_ttl_days);
        let auth_service = AuthService::new(user_repo, company_repo.clone(), tokens, db_pool.clone());

        let notification_service = NotificationService::new(engagement_repo.clone(), change_feed.clone());
        let catalog_service = CatalogService::new(catalog_repo.clone(), inventory_repo.clone(), change_feed.clone());
        let inventory_service = InventoryService::new(
            inventory_repo.clone(),
            catalog_repo.clone(),
            notification_service.clone(),
            change_feed.clone(),
        );
        let sales_service = Arc::new(SalesService::new(
            db_pool.clone(),
            sales_repo.clone(),
            inventory_repo,
            partner_repo.clone(),
            notification_service.clone(),
            change_feed.clone(),
        ));
        let marketing_service =
            MarketingService::new(engagement_repo.clone(), partner_repo.clone(), change_feed.clone());

        Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            auth_service,
            company_repo,
            catalog_service,
            partner_repo,
            inventory_service,
            sales_service,
            cart_registry: Arc::new(CartRegistry::new()),
            report_service: ReportService::new(catalog_repo, sales_repo),
            dashboard_service: DashboardService::new(DashboardRepository::new()),
            marketing_service,
            engagement_repo,
            notification_service,
            settings_repo: SettingsRepository::new(),
            change_feed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/loove"), ("JWT_SECRET", "s3cr3t")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.jwt_ttl_days, 7);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn optional_vars_override_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/loove"),
            ("JWT_SECRET", "s3cr3t"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("JWT_TTL_DAYS", "1"),
            ("CORS_ORIGIN", "http://localhost:5173"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.jwt_ttl_days, 1);
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn required_vars_must_be_present() {
        assert!(config_from(&[("JWT_SECRET", "s3cr3t")]).is_err());
        assert!(config_from(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("DB_MAX_CONNECTIONS", "muitas"),
        ]);
        assert!(err.is_err());
    }
}

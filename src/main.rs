//src/main.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match origin {
        Some(origin) => layer.allow_origin(origin.parse::<HeaderValue>()?),
        None => layer.allow_origin(Any),
    })
}

fn tenant_routes(app_state: &AppState) -> Router<AppState> {
    use handlers::{
        calls, catalog, dashboard, inventory, marketing, notifications, partners, pos, reports, sales,
        settings,
    };

    Router::new()
        // --- Dashboard ---
        .route("/dashboard/summary", get(dashboard::get_summary))
        .route("/dashboard/top-products", get(dashboard::get_top_products))
        // --- PDV ---
        .route("/pos/cart", get(pos::get_cart).delete(pos::clear_cart))
        .route("/pos/cart/items", post(pos::add_item))
        .route(
            "/pos/cart/items/{product_id}",
            put(pos::update_item).delete(pos::remove_item),
        )
        .route("/pos/cart/discount", put(pos::set_discount))
        .route("/pos/checkout", post(pos::checkout))
        // --- Vendas ---
        .route("/sales", get(sales::list_sales))
        .route("/sales/{id}", get(sales::get_sale))
        // --- Catálogo ---
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/products/{id}",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        // --- Parceiros ---
        .route("/suppliers", get(partners::list_suppliers).post(partners::create_supplier))
        .route(
            "/suppliers/{id}",
            put(partners::update_supplier).delete(partners::delete_supplier),
        )
        .route("/crm/clients", get(partners::list_clients).post(partners::create_client))
        .route(
            "/crm/clients/{id}",
            get(partners::get_client)
                .put(partners::update_client)
                .delete(partners::delete_client),
        )
        // --- Estoque ---
        .route(
            "/inventory/movements",
            get(inventory::list_movements).post(inventory::create_movement),
        )
        .route("/inventory/low-stock", get(inventory::list_low_stock))
        // --- Relatórios ---
        .route("/reports/sales-window", get(reports::sales_window))
        .route("/reports/payment-methods", get(reports::payment_methods))
        .route("/reports/stock-value", get(reports::stock_value))
        // --- Marketing ---
        .route(
            "/marketing/campaigns",
            get(marketing::list_campaigns).post(marketing::create_campaign),
        )
        .route(
            "/marketing/campaigns/{id}",
            get(marketing::get_campaign)
                .put(marketing::update_campaign)
                .delete(marketing::delete_campaign),
        )
        .route("/marketing/campaigns/{id}/schedule", post(marketing::schedule_campaign))
        .route("/marketing/campaigns/{id}/send", post(marketing::send_campaign))
        // --- Ligações ---
        .route("/calls", get(calls::list_calls).post(calls::create_call))
        .route("/calls/{id}", axum::routing::delete(calls::delete_call))
        // --- Notificações ---
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/stream", get(notifications::stream))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/notifications/{id}",
            axum::routing::delete(notifications::delete_notification),
        )
        // --- Configurações ---
        .route("/settings", get(settings::list_settings))
        .route("/settings/{key}", put(settings::upsert_setting))
        // Auth + empresa em tudo (route_layer: 404 continua 404)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout));

    // Rotas de usuário (só token, sem empresa)
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/companies", get(handlers::auth::get_my_companies))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(app_state.config.cors_origin.as_deref())?;
    let bind_addr = app_state.config.bind_addr.clone();

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api", tenant_routes(&app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

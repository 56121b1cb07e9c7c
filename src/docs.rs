// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_companies,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_top_products,

        // --- PDV ---
        handlers::pos::get_cart,
        handlers::pos::add_item,
        handlers::pos::update_item,
        handlers::pos::set_discount,
        handlers::pos::checkout,

        // --- Sales ---
        handlers::sales::list_sales,
        handlers::sales::get_sale,

        // --- Catalog ---
        handlers::catalog::list_products,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::catalog::list_categories,
        handlers::catalog::create_category,

        // --- CRM / Suppliers ---
        handlers::partners::list_clients,
        handlers::partners::create_client,
        handlers::partners::list_suppliers,
        handlers::partners::create_supplier,

        // --- Inventory ---
        handlers::inventory::create_movement,
        handlers::inventory::list_movements,
        handlers::inventory::list_low_stock,

        // --- Reports ---
        handlers::reports::sales_window,
        handlers::reports::payment_methods,
        handlers::reports::stock_value,

        // --- Marketing ---
        handlers::marketing::list_campaigns,
        handlers::marketing::create_campaign,
        handlers::marketing::update_campaign,
        handlers::marketing::schedule_campaign,
        handlers::marketing::send_campaign,

        // --- Calls ---
        handlers::calls::list_calls,
        handlers::calls::create_call,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::notifications::stream,

        // --- Settings ---
        handlers::settings::list_settings,
        handlers::settings::upsert_setting,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::UserCompany,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::tenancy::Company,

            // --- Dashboard / Relatórios ---
            models::dashboard::DashboardSummary,
            models::dashboard::DailySales,
            models::dashboard::TopProductEntry,
            models::dashboard::StockValueReport,

            // --- PDV ---
            services::cart::CartItem,
            services::cart::CartTotals,
            services::pos_service::CartView,
            handlers::pos::AddCartItemPayload,
            handlers::pos::UpdateCartItemPayload,
            handlers::pos::SetDiscountPayload,
            handlers::pos::CheckoutPayload,

            // --- Vendas ---
            models::sales::SaleStatus,
            models::sales::PaymentMethod,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleDetail,

            // --- Catálogo ---
            models::catalog::ProductStatus,
            models::catalog::Product,
            models::catalog::Category,
            handlers::catalog::ProductPayload,
            handlers::catalog::CategoryPayload,

            // --- Parceiros ---
            models::partners::Client,
            models::partners::Supplier,
            handlers::partners::ClientPayload,
            handlers::partners::SupplierPayload,

            // --- Estoque ---
            models::inventory::MovementType,
            models::inventory::StockMovement,
            handlers::inventory::StockMovementPayload,
            handlers::inventory::StockMovementResponse,

            // --- Engajamento ---
            models::engagement::CampaignStatus,
            models::engagement::EmailCampaign,
            models::engagement::CallDirection,
            models::engagement::CallRecord,
            models::engagement::Notification,
            handlers::marketing::CampaignPayload,
            handlers::marketing::ScheduleCampaignPayload,
            handlers::calls::CallPayload,
            handlers::notifications::MarkAllReadResponse,
            services::realtime::ChangeAction,
            services::realtime::ChangeEvent,

            // --- Settings ---
            models::settings::SystemSetting,
            models::settings::UpdateSettingRequest,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Lojas"),
        (name = "Dashboard", description = "Indicadores do dia"),
        (name = "POS", description = "Caixa: carrinho e checkout"),
        (name = "Sales", description = "Histórico de Vendas"),
        (name = "Catalog", description = "Produtos e Categorias"),
        (name = "CRM", description = "Clientes"),
        (name = "Suppliers", description = "Fornecedores"),
        (name = "Inventory", description = "Movimentações e Estoque Baixo"),
        (name = "Reports", description = "Relatórios de Vendas e Estoque"),
        (name = "Marketing", description = "Campanhas de E-mail"),
        (name = "Calls", description = "Registro de Ligações"),
        (name = "Notifications", description = "Notificações e Feed de Mudanças"),
        (name = "Settings", description = "Configurações da Loja")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::CompanyRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod partner_repo;
pub use partner_repo::PartnerRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod engagement_repo;
pub use engagement_repo::EngagementRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;

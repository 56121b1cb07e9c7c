pub mod auth;
pub mod cart;
pub mod catalog_service;
pub mod dashboard_service;
pub mod inventory_service;
pub mod marketing_service;
pub mod notification_service;
pub mod pos_service;
pub mod realtime;
pub mod report_service;
pub mod sales_service;

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod engagement;
pub mod inventory;
pub mod partners;
pub mod sales;
pub mod settings;
pub mod tenancy;

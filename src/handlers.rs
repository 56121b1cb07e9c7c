pub mod auth;
pub mod calls;
pub mod catalog;
pub mod dashboard;
pub mod inventory;
pub mod marketing;
pub mod notifications;
pub mod partners;
pub mod pos;
pub mod reports;
pub mod sales;
pub mod settings;

//! HTTP handlers for quotation-service.

pub mod branches;
pub mod clients;
pub mod health;
pub mod inventory;
pub mod products;
pub mod projects;
pub mod quotations;
pub mod sales_orders;
pub mod suppliers;

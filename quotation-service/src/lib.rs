//! Backend for a building-materials distributor: catalog and client CRUD,
//! the quotation (cotización) workflow, sales-order conversion, and PDF
//! document generation.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

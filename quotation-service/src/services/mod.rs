//! Business services for quotation-service.

pub mod database;
pub mod margin;
pub mod metrics;
pub mod pdf;
pub mod quotations;

pub use database::Database;
pub use metrics::init_metrics;
pub use quotations::QuotationService;

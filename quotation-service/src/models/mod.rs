//! Domain models for quotation-service.

mod branch;
mod client;
mod inventory;
mod product;
mod project;
mod quotation;
mod sales_order;
mod supplier;

pub use branch::{Branch, CreateBranch};
pub use client::{Client, ClientQuotation, CreateClient};
pub use inventory::{CreateInventoryItem, InventoryItem, UpdateInventoryItem};
pub use product::{CreateProduct, Product, UpdateProduct};
pub use project::{CreateProject, Project, ReassignProject, UpdateProject};
pub use quotation::{
    AssociationStatus, ConvertQuotation, CreateQuotation, CreateQuotationDetail, Quotation,
    QuotationDetail, QuotationResponse, UpdateQuotation,
};
pub use sales_order::{SalesOrder, SalesOrderDetail, SalesOrderResponse};
pub use supplier::{CreateSupplier, Supplier};

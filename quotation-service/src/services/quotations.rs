//! Quotation workflow: create, read, update, convert, delete.
//!
//! Mutations run inside a single transaction so a failed line item never
//! leaves a half-written quotation behind. PDF generation happens after
//! commit; a rendering failure is reported to the caller but the committed
//! data stands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{info, instrument, warn};

use service_core::error::AppError;

use crate::models::{
    AssociationStatus, ClientQuotation, ConvertQuotation, CreateQuotation, CreateQuotationDetail,
    Quotation, QuotationDetail, QuotationResponse, SalesOrderResponse, UpdateQuotation,
};
use crate::services::database::Database;
use crate::services::margin::resolve_margin;
use crate::services::metrics::{DOCUMENTS_RENDERED_TOTAL, QUOTATION_OPERATIONS_TOTAL};
use crate::services::pdf::{PdfRenderer, QuotationDocument};

/// Quotation header joined with its project's display fields.
#[derive(Debug, sqlx::FromRow)]
struct QuotationHeaderRow {
    id: i64,
    client_name: String,
    created_utc: chrono::DateTime<chrono::Utc>,
    total: Decimal,
    user_id: i64,
    project_id: Option<i64>,
    project_name: Option<String>,
    project_address: Option<String>,
}

const HEADER_QUERY: &str = r#"
    SELECT q.id, q.client_name, q.created_utc, q.total, q.user_id, q.project_id,
           p.name AS project_name, p.address AS project_address
    FROM quotations q
    LEFT JOIN projects p ON p.id = q.project_id
"#;

const DETAIL_QUERY: &str = r#"
    SELECT d.id, d.quotation_id, d.product_id, d.quantity, d.unit_price, d.total,
           d.variant, d.cost_basis, d.margin_percent, d.margin_amount,
           pr.name AS product_name, pr.color AS product_color, pr.format AS product_format
    FROM quotation_details d
    LEFT JOIN products pr ON pr.id = d.product_id
    WHERE d.quotation_id = $1
    ORDER BY d.id
"#;

/// Orchestrates the quotation lifecycle.
#[derive(Clone)]
pub struct QuotationService {
    db: Arc<Database>,
    renderer: PdfRenderer,
    storage_path: PathBuf,
}

impl QuotationService {
    pub fn new(db: Arc<Database>, renderer: PdfRenderer, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            renderer,
            storage_path: storage_path.into(),
        }
    }

    /// Path of the formal quotation PDF for a quotation.
    pub fn quotation_pdf_path(&self, quotation_id: i64) -> PathBuf {
        self.storage_path
            .join(format!("Cotizacion_{}.pdf", quotation_id))
    }

    /// Path of the delivery note PDF for a quotation.
    pub fn delivery_note_path(&self, quotation_id: i64) -> PathBuf {
        self.storage_path
            .join(format!("NotaRemision_{}.pdf", quotation_id))
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Create a quotation with its line items, snapshotting the client name
    /// and writing both PDFs after commit.
    #[instrument(skip(self, input), fields(client_id = input.client_id, user_id = user_id))]
    pub async fn create(
        &self,
        input: CreateQuotation,
        user_id: i64,
    ) -> Result<QuotationResponse, AppError> {
        if input.details.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "A quotation must include at least one product"
            )));
        }

        let mut tx = self.begin().await?;

        let client_name: String =
            sqlx::query_scalar("SELECT name FROM clients WHERE id = $1")
                .bind(input.client_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to resolve client: {}", e))
                })?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow!("Client {} not found", input.client_id))
                })?;

        if let Some(project_id) = input.project_id {
            Self::check_project(&mut *tx, project_id).await?;
        }

        let quotation_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO quotations (client_name, total, user_id, project_id)
            VALUES ($1, 0, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&client_name)
        .bind(user_id)
        .bind(input.project_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to create quotation: {}", e)))?;

        let line_sum = Self::insert_details(&mut tx, quotation_id, &input.details).await?;
        let total = input.total.unwrap_or(line_sum).round_dp(2);

        sqlx::query("UPDATE quotations SET total = $2 WHERE id = $1")
            .bind(quotation_id)
            .bind(total)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to set quotation total: {}", e))
            })?;

        sqlx::query(
            r#"
            INSERT INTO client_quotations (client_id, quotation_id, status)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(input.client_id)
        .bind(quotation_id)
        .bind(AssociationStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow!("Failed to create client association: {}", e))
        })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit quotation: {}", e)))?;

        QUOTATION_OPERATIONS_TOTAL
            .with_label_values(&["create"])
            .inc();
        info!(quotation_id = quotation_id, total = %total, "Quotation created");

        let aggregate = self.load_aggregate(quotation_id).await?;
        self.generate_documents(
            &aggregate,
            input.shipping_cost,
            input.shipping_variant.as_deref(),
        )?;

        Ok(aggregate)
    }

    /// Partially update a quotation. A new `client_id` refreshes the name
    /// snapshot and clears the project unless a `project_id` comes with it;
    /// a `details` list replaces all line items. Both PDFs are rewritten
    /// whenever anything document-visible changed.
    #[instrument(skip(self, input), fields(quotation_id = quotation_id))]
    pub async fn update(
        &self,
        quotation_id: i64,
        input: UpdateQuotation,
    ) -> Result<QuotationResponse, AppError> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, Quotation>(
            r#"
            SELECT id, client_name, created_utc, total, user_id, project_id
            FROM quotations
            WHERE id = $1
            "#,
        )
        .bind(quotation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to load quotation: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow!("Quotation {} not found", quotation_id)))?;

        let mut client_name = current.client_name;
        let mut project_id = current.project_id;
        let mut header_changed = false;

        if let Some(client_id) = input.client_id {
            client_name = sqlx::query_scalar("SELECT name FROM clients WHERE id = $1")
                .bind(client_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to resolve client: {}", e))
                })?
                .ok_or_else(|| AppError::NotFound(anyhow!("Client {} not found", client_id)))?;
            // The old project belonged to the old client.
            project_id = None;
            header_changed = true;

            sqlx::query("UPDATE client_quotations SET client_id = $2 WHERE quotation_id = $1")
                .bind(quotation_id)
                .bind(client_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to move client association: {}", e))
                })?;
        }

        if let Some(new_project) = input.project_id {
            Self::check_project(&mut *tx, new_project).await?;
            project_id = Some(new_project);
            header_changed = true;
        }

        let mut total = current.total;
        let mut details_changed = false;

        if let Some(details) = &input.details {
            if details.is_empty() {
                return Err(AppError::BadRequest(anyhow!(
                    "A quotation must include at least one product"
                )));
            }
            sqlx::query("DELETE FROM quotation_details WHERE quotation_id = $1")
                .bind(quotation_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to replace line items: {}", e))
                })?;
            total = Self::insert_details(&mut tx, quotation_id, details).await?;
            details_changed = true;
        }

        if let Some(explicit) = input.total {
            total = explicit;
            header_changed = true;
        }
        let total = total.round_dp(2);

        if header_changed || details_changed {
            sqlx::query(
                r#"
                UPDATE quotations
                SET client_name = $2, project_id = $3, total = $4
                WHERE id = $1
                "#,
            )
            .bind(quotation_id)
            .bind(&client_name)
            .bind(project_id)
            .bind(total)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to update quotation: {}", e))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit update: {}", e)))?;

        QUOTATION_OPERATIONS_TOTAL
            .with_label_values(&["update"])
            .inc();
        info!(quotation_id = quotation_id, "Quotation updated");

        let aggregate = self.load_aggregate(quotation_id).await?;

        let document_visible = header_changed
            || details_changed
            || input.shipping_cost.is_some()
            || input.shipping_variant.is_some();
        if document_visible {
            self.generate_documents(
                &aggregate,
                input.shipping_cost,
                input.shipping_variant.as_deref(),
            )?;
        }

        Ok(aggregate)
    }

    /// Convert a quotation into a sales order, copying header and line items
    /// as a point-in-time snapshot. A quotation can be converted only once.
    #[instrument(skip(self, input), fields(quotation_id = quotation_id))]
    pub async fn convert(
        &self,
        quotation_id: i64,
        input: ConvertQuotation,
    ) -> Result<SalesOrderResponse, AppError> {
        let mut tx = self.begin().await?;

        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            SELECT id, client_name, created_utc, total, user_id, project_id
            FROM quotations
            WHERE id = $1
            "#,
        )
        .bind(quotation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to load quotation: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow!("Quotation {} not found", quotation_id)))?;

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM sales_orders WHERE quotation_id = $1")
                .bind(quotation_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to check for sales order: {}", e))
                })?;
        if let Some(order_id) = existing {
            return Err(AppError::BadRequest(anyhow!(
                "Quotation {} was already converted to sales order {}",
                quotation_id,
                order_id
            )));
        }

        let status = input.status.unwrap_or(AssociationStatus::Fulfilling);

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales_orders (quotation_id, client_name, total, user_id, project_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(quotation_id)
        .bind(&quotation.client_name)
        .bind(quotation.total)
        .bind(quotation.user_id)
        .bind(quotation.project_id)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::BadRequest(anyhow!(
                    "Quotation {} was already converted to a sales order",
                    quotation_id
                ))
            }
            _ => AppError::DatabaseError(anyhow!("Failed to create sales order: {}", e)),
        })?;

        sqlx::query(
            r#"
            INSERT INTO sales_order_details (order_id, product_id, quantity, unit_price, total, variant)
            SELECT $1, product_id, quantity, unit_price, total, variant
            FROM quotation_details
            WHERE quotation_id = $2
            "#,
        )
        .bind(order_id)
        .bind(quotation_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow!("Failed to copy line items: {}", e))
        })?;

        sqlx::query("UPDATE client_quotations SET status = $2 WHERE quotation_id = $1")
            .bind(quotation_id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to update association status: {}", e))
            })?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit conversion: {}", e)))?;

        QUOTATION_OPERATIONS_TOTAL
            .with_label_values(&["convert"])
            .inc();
        info!(quotation_id = quotation_id, order_id = order_id, "Quotation converted");

        self.db.get_sales_order(order_id).await?.ok_or_else(|| {
            AppError::DatabaseError(anyhow!("Converted sales order {} not found", order_id))
        })
    }

    /// Delete a quotation, its line items and association, and its PDFs.
    #[instrument(skip(self), fields(quotation_id = quotation_id))]
    pub async fn delete(&self, quotation_id: i64) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        // The sales order references the quotation without a cascade.
        let converted: Option<i64> =
            sqlx::query_scalar("SELECT id FROM sales_orders WHERE quotation_id = $1")
                .bind(quotation_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to check for sales order: {}", e))
                })?;
        if let Some(order_id) = converted {
            return Err(AppError::BadRequest(anyhow!(
                "Quotation {} was converted to sales order {}; delete the sales order first",
                quotation_id,
                order_id
            )));
        }

        let result = sqlx::query("DELETE FROM quotations WHERE id = $1")
            .bind(quotation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to delete quotation: {}", e))
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow!(
                "Quotation {} not found",
                quotation_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit deletion: {}", e)))?;

        QUOTATION_OPERATIONS_TOTAL
            .with_label_values(&["delete"])
            .inc();
        info!(quotation_id = quotation_id, "Quotation deleted");

        // Best effort; the database row is already gone.
        self.remove_file(&self.quotation_pdf_path(quotation_id));
        self.remove_file(&self.delivery_note_path(quotation_id));

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Load the full quotation aggregate.
    #[instrument(skip(self), fields(quotation_id = quotation_id))]
    pub async fn get(&self, quotation_id: i64) -> Result<QuotationResponse, AppError> {
        self.load_aggregate(quotation_id).await
    }

    /// List open quotations: those without a sales order.
    #[instrument(skip(self))]
    pub async fn list_open(&self) -> Result<Vec<QuotationResponse>, AppError> {
        let headers = sqlx::query_as::<_, QuotationHeaderRow>(&format!(
            r#"
            {HEADER_QUERY}
            LEFT JOIN sales_orders so ON so.quotation_id = q.id
            WHERE so.id IS NULL
            ORDER BY q.id DESC
            "#
        ))
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list quotations: {}", e)))?;

        let mut responses = Vec::with_capacity(headers.len());
        for header in headers {
            responses.push(self.assemble(header).await?);
        }
        Ok(responses)
    }

    /// List the quotations of one client, regardless of conversion state.
    #[instrument(skip(self), fields(client_id = client_id))]
    pub async fn list_for_client(
        &self,
        client_id: i64,
    ) -> Result<Vec<QuotationResponse>, AppError> {
        let headers = sqlx::query_as::<_, QuotationHeaderRow>(&format!(
            r#"
            {HEADER_QUERY}
            JOIN client_quotations cq ON cq.quotation_id = q.id
            WHERE cq.client_id = $1
            ORDER BY q.id DESC
            "#
        ))
        .bind(client_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow!("Failed to list client quotations: {}", e))
        })?;

        let mut responses = Vec::with_capacity(headers.len());
        for header in headers {
            responses.push(self.assemble(header).await?);
        }
        Ok(responses)
    }

    /// Read the formal quotation PDF, regenerating it from the database when
    /// the file is missing.
    #[instrument(skip(self), fields(quotation_id = quotation_id))]
    pub async fn quotation_pdf(&self, quotation_id: i64) -> Result<Vec<u8>, AppError> {
        let path = self.quotation_pdf_path(quotation_id);
        if let Ok(bytes) = fs::read(&path) {
            return Ok(bytes);
        }

        let aggregate = self.load_aggregate(quotation_id).await?;
        let document = QuotationDocument::from_aggregate(&aggregate, None, None)?;
        let bytes = self.renderer.render_quotation(&document)?;
        self.write_document(&path, &bytes, "quotation")?;
        Ok(bytes)
    }

    /// Read the delivery note PDF, regenerating it when the file is missing.
    #[instrument(skip(self), fields(quotation_id = quotation_id))]
    pub async fn delivery_note_pdf(&self, quotation_id: i64) -> Result<Vec<u8>, AppError> {
        let path = self.delivery_note_path(quotation_id);
        if let Ok(bytes) = fs::read(&path) {
            return Ok(bytes);
        }

        let aggregate = self.load_aggregate(quotation_id).await?;
        let document = QuotationDocument::from_aggregate(&aggregate, None, None)?;
        let bytes = self.renderer.render_delivery_note(&document)?;
        self.write_document(&path, &bytes, "delivery_note")?;
        Ok(bytes)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.db
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to begin transaction: {}", e)))
    }

    async fn check_project(conn: &mut PgConnection, project_id: i64) -> Result<(), AppError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to resolve project: {}", e)))?;
        if exists.is_none() {
            return Err(AppError::NotFound(anyhow!(
                "Project {} not found",
                project_id
            )));
        }
        Ok(())
    }

    /// Insert line items, resolving margin fields and computing each line's
    /// total. Returns the sum of line totals rounded to two decimals.
    async fn insert_details(
        tx: &mut Transaction<'static, Postgres>,
        quotation_id: i64,
        details: &[CreateQuotationDetail],
    ) -> Result<Decimal, AppError> {
        let mut sum = Decimal::ZERO;

        for detail in details {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
                    .bind(detail.product_id)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow!("Failed to resolve product: {}", e))
                    })?;
            if exists.is_none() {
                return Err(AppError::NotFound(anyhow!(
                    "Product {} not found",
                    detail.product_id
                )));
            }

            let margin = resolve_margin(
                detail.quantity,
                detail.unit_price,
                detail.cost_basis,
                detail.margin_percent,
                detail.margin_amount,
            )?;

            let line_total = (detail.quantity * detail.unit_price).round_dp(2);
            sum += line_total;

            sqlx::query(
                r#"
                INSERT INTO quotation_details (
                    quotation_id, product_id, quantity, unit_price, total,
                    variant, cost_basis, margin_percent, margin_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(quotation_id)
            .bind(detail.product_id)
            .bind(detail.quantity)
            .bind(detail.unit_price)
            .bind(line_total)
            .bind(&detail.variant)
            .bind(detail.cost_basis)
            .bind(margin.percent)
            .bind(margin.amount)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to insert line item: {}", e))
            })?;
        }

        Ok(sum.round_dp(2))
    }

    async fn load_aggregate(&self, quotation_id: i64) -> Result<QuotationResponse, AppError> {
        let header = sqlx::query_as::<_, QuotationHeaderRow>(&format!(
            "{HEADER_QUERY} WHERE q.id = $1"
        ))
        .bind(quotation_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to load quotation: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow!("Quotation {} not found", quotation_id)))?;

        self.assemble(header).await
    }

    async fn assemble(&self, header: QuotationHeaderRow) -> Result<QuotationResponse, AppError> {
        let details = sqlx::query_as::<_, QuotationDetail>(DETAIL_QUERY)
            .bind(header.id)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to load line items: {}", e))
            })?;

        let association = sqlx::query_as::<_, ClientQuotation>(
            "SELECT id, client_id, quotation_id, status FROM client_quotations WHERE quotation_id = $1",
        )
        .bind(header.id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow!("Failed to load client association: {}", e))
        })?;

        Ok(QuotationResponse {
            quotation: Quotation {
                id: header.id,
                client_name: header.client_name,
                created_utc: header.created_utc,
                total: header.total,
                user_id: header.user_id,
                project_id: header.project_id,
            },
            details,
            project_name: header.project_name,
            project_address: header.project_address,
            association,
        })
    }

    /// Render and write both PDFs for a committed quotation.
    fn generate_documents(
        &self,
        aggregate: &QuotationResponse,
        shipping_cost: Option<Decimal>,
        shipping_variant: Option<&str>,
    ) -> Result<(), AppError> {
        let document =
            QuotationDocument::from_aggregate(aggregate, shipping_cost, shipping_variant)?;

        let quotation_bytes = self.renderer.render_quotation(&document)?;
        self.write_document(
            &self.quotation_pdf_path(aggregate.quotation.id),
            &quotation_bytes,
            "quotation",
        )?;

        let note_bytes = self.renderer.render_delivery_note(&document)?;
        self.write_document(
            &self.delivery_note_path(aggregate.quotation.id),
            &note_bytes,
            "delivery_note",
        )?;

        Ok(())
    }

    fn write_document(&self, path: &Path, bytes: &[u8], kind: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.storage_path).map_err(|e| {
            AppError::DocumentError(anyhow!("Failed to create document storage: {}", e))
        })?;
        fs::write(path, bytes).map_err(|e| {
            AppError::DocumentError(anyhow!("Failed to write {} PDF: {}", kind, e))
        })?;

        DOCUMENTS_RENDERED_TOTAL.with_label_values(&[kind]).inc();
        info!(path = %path.display(), kind = kind, "PDF written");

        Ok(())
    }

    fn remove_file(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove PDF");
            }
        }
    }
}

//! PDF rendering for the formal quotation and the delivery note.
//!
//! The renderer works on a plain data projection of the quotation
//! aggregate and returns raw PDF bytes; deciding file paths and writing to
//! disk is the orchestrator's job.

use anyhow::anyhow;
use genpdf::elements::{Break, LinearLayout, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Alignment, Document, Element, Margins, SimplePageDecorator};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{error, info};

use crate::models::QuotationResponse;

/// One line of a rendered document.
#[derive(Debug, Clone)]
pub struct DocumentLine {
    pub product_id: Option<i64>,
    pub name: String,
    pub color: Option<String>,
    pub format: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub variant: Option<String>,
}

/// Plain-data projection of a quotation aggregate, detached from the
/// database layer.
#[derive(Debug, Clone)]
pub struct QuotationDocument {
    pub id: i64,
    pub date: String,
    pub client_name: String,
    pub project_name: String,
    pub project_address: String,
    pub lines: Vec<DocumentLine>,
    pub total: Decimal,
    pub shipping_cost: Decimal,
    pub shipping_variant: String,
}

impl QuotationDocument {
    /// Builds the projection from a loaded aggregate, failing fast when a
    /// field required by the templates is missing.
    pub fn from_aggregate(
        aggregate: &QuotationResponse,
        shipping_cost: Option<Decimal>,
        shipping_variant: Option<&str>,
    ) -> Result<Self, AppError> {
        if aggregate.quotation.client_name.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "Quotation {} has no client name for document generation",
                aggregate.quotation.id
            )));
        }
        if aggregate.details.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "Quotation {} has no line items for document generation",
                aggregate.quotation.id
            )));
        }

        let lines = aggregate
            .details
            .iter()
            .map(|d| DocumentLine {
                product_id: Some(d.product_id),
                name: d
                    .product_name
                    .clone()
                    .unwrap_or_else(|| "Sin nombre".to_string()),
                color: d.product_color.clone(),
                format: d.product_format.clone(),
                quantity: d.quantity,
                unit_price: d.unit_price,
                total: d.total,
                variant: d.variant.clone(),
            })
            .collect();

        Ok(QuotationDocument {
            id: aggregate.quotation.id,
            date: aggregate.quotation.created_utc.format("%d/%m/%Y").to_string(),
            client_name: aggregate.quotation.client_name.clone(),
            project_name: aggregate
                .project_name
                .clone()
                .unwrap_or_else(|| "Sin proyecto seleccionado".to_string()),
            project_address: aggregate
                .project_address
                .clone()
                .unwrap_or_else(|| "Dirección no especificada".to_string()),
            lines,
            total: aggregate.quotation.total,
            shipping_cost: shipping_cost.unwrap_or(Decimal::ZERO),
            shipping_variant: shipping_variant.unwrap_or("N/A").to_string(),
        })
    }
}

/// Formats a monetary value with thousands grouping and two decimals.
/// Never fails: malformed intermediate states fall back to a plain
/// two-decimal rendering.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded);
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let Some((int_part, frac_part)) = digits.split_once('.') else {
        return text;
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Renders quotation and delivery-note PDFs.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    font_dir: String,
    font_family: String,
    image_base_url: String,
}

impl PdfRenderer {
    pub fn new(font_dir: &str, font_family: &str, image_base_url: &str) -> Self {
        Self {
            font_dir: font_dir.to_string(),
            font_family: font_family.to_string(),
            image_base_url: image_base_url.to_string(),
        }
    }

    /// Image URL for a line item, derived from the product id with a fixed
    /// fallback when no product is referenced.
    pub fn image_url(&self, product_id: Option<i64>) -> String {
        match product_id {
            Some(id) => format!("{}/producto_{}.jpeg", self.image_base_url, id),
            None => format!("{}/default-image.jpeg", self.image_base_url),
        }
    }

    fn new_document(&self, title: &str) -> Result<Document, AppError> {
        let font_family =
            genpdf::fonts::from_files(&self.font_dir, &self.font_family, None).map_err(|e| {
                error!(
                    font_dir = %self.font_dir,
                    font_family = %self.font_family,
                    error = %e,
                    "Failed to load PDF fonts"
                );
                AppError::DocumentError(anyhow!("Failed to load PDF fonts: {}", e))
            })?;

        let mut doc = Document::new(font_family);
        doc.set_title(title);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(Margins::trbl(15, 12, 15, 12));
        doc.set_page_decorator(decorator);
        Ok(doc)
    }

    fn render_bytes(&self, doc: Document, kind: &str, id: i64) -> Result<Vec<u8>, AppError> {
        let mut bytes = Vec::new();
        doc.render(&mut bytes).map_err(|e| {
            error!(quotation_id = id, kind = kind, error = %e, "PDF rasterization failed");
            AppError::DocumentError(anyhow!("Failed to render {} PDF: {}", kind, e))
        })?;
        info!(quotation_id = id, kind = kind, size = bytes.len(), "PDF rendered");
        Ok(bytes)
    }

    /// Renders the formal quotation with unit prices and totals.
    pub fn render_quotation(&self, data: &QuotationDocument) -> Result<Vec<u8>, AppError> {
        let mut doc = self.new_document(&format!("Cotización {}", data.id))?;

        let title_style = Style::new().bold().with_font_size(16);
        let label_style = Style::new().bold();

        doc.push(
            Paragraph::new(format!("Cotización No. {}", data.id))
                .aligned(Alignment::Center)
                .styled(title_style),
        );
        doc.push(
            Paragraph::new(format!("Fecha: {}", data.date)).aligned(Alignment::Center),
        );
        doc.push(Break::new(1));
        doc.push(Paragraph::new(format!("Cliente: {}", data.client_name)).styled(label_style));
        doc.push(Paragraph::new(format!("Proyecto: {}", data.project_name)));
        doc.push(Paragraph::new(format!("Dirección: {}", data.project_address)));
        doc.push(Break::new(1));

        let mut table = TableLayout::new(vec![4, 2, 2, 2, 2, 2]);
        table.set_cell_decorator(genpdf::elements::FrameCellDecorator::new(true, true, false));
        self.header_row(
            &mut table,
            &["Producto", "Formato", "Cantidad", "Variante", "P. Unitario", "Importe"],
        )?;

        for line in &data.lines {
            let name = match &line.color {
                Some(color) => format!("{} ({})", line.name, color),
                None => line.name.clone(),
            };
            table
                .row()
                .element(self.product_cell(name, line.product_id))
                .element(Paragraph::new(line.format.clone().unwrap_or_default()).padded(1))
                .element(
                    Paragraph::new(line.quantity.to_string())
                        .aligned(Alignment::Right)
                        .padded(1),
                )
                .element(Paragraph::new(line.variant.clone().unwrap_or_default()).padded(1))
                .element(
                    Paragraph::new(format_currency(line.unit_price))
                        .aligned(Alignment::Right)
                        .padded(1),
                )
                .element(
                    Paragraph::new(format_currency(line.total))
                        .aligned(Alignment::Right)
                        .padded(1),
                )
                .push()
                .map_err(|e| {
                    AppError::DocumentError(anyhow!("Failed to lay out quotation row: {}", e))
                })?;
        }

        doc.push(table);
        doc.push(Break::new(1));
        if !data.shipping_cost.is_zero() {
            doc.push(
                Paragraph::new(format!(
                    "Envío ({}): ${}",
                    data.shipping_variant,
                    format_currency(data.shipping_cost)
                ))
                .aligned(Alignment::Right),
            );
        }
        doc.push(
            Paragraph::new(format!("Total: ${}", format_currency(data.total)))
                .aligned(Alignment::Right)
                .styled(Style::new().bold().with_font_size(12)),
        );

        self.render_bytes(doc, "quotation", data.id)
    }

    /// Renders the delivery note: shipped items without pricing.
    pub fn render_delivery_note(&self, data: &QuotationDocument) -> Result<Vec<u8>, AppError> {
        let mut doc = self.new_document(&format!("Nota de Remisión {}", data.id))?;

        doc.push(
            Paragraph::new(format!("Nota de Remisión No. {}", data.id))
                .aligned(Alignment::Center)
                .styled(Style::new().bold().with_font_size(16)),
        );
        doc.push(
            Paragraph::new(format!("Fecha: {}", data.date)).aligned(Alignment::Center),
        );
        doc.push(Break::new(1));
        doc.push(Paragraph::new(format!("Cliente: {}", data.client_name)).styled(Style::new().bold()));
        doc.push(Paragraph::new(format!("Proyecto: {}", data.project_name)));
        doc.push(Paragraph::new(format!("Dirección: {}", data.project_address)));
        doc.push(Break::new(1));

        let mut table = TableLayout::new(vec![5, 2, 2, 2]);
        table.set_cell_decorator(genpdf::elements::FrameCellDecorator::new(true, true, false));
        self.header_row(&mut table, &["Producto", "Formato", "Color", "Cantidad"])?;

        for line in &data.lines {
            table
                .row()
                .element(self.product_cell(line.name.clone(), line.product_id))
                .element(Paragraph::new(line.format.clone().unwrap_or_default()).padded(1))
                .element(Paragraph::new(line.color.clone().unwrap_or_default()).padded(1))
                .element(
                    Paragraph::new(line.quantity.to_string())
                        .aligned(Alignment::Right)
                        .padded(1),
                )
                .push()
                .map_err(|e| {
                    AppError::DocumentError(anyhow!("Failed to lay out delivery-note row: {}", e))
                })?;
        }

        doc.push(table);

        self.render_bytes(doc, "delivery_note", data.id)
    }

    /// Product cell for a table row: the display name with the catalog
    /// image reference in small print underneath.
    fn product_cell(&self, name: String, product_id: Option<i64>) -> impl Element {
        let mut cell = LinearLayout::vertical();
        cell.push(Paragraph::new(name));
        cell.push(
            Paragraph::new(self.image_url(product_id)).styled(Style::new().with_font_size(7)),
        );
        cell.padded(1)
    }

    fn header_row(&self, table: &mut TableLayout, headers: &[&str]) -> Result<(), AppError> {
        let mut row = table.row();
        for header in headers {
            row = row.element(
                Paragraph::new(*header)
                    .styled(Style::new().bold())
                    .padded(1),
            );
        }
        row.push()
            .map_err(|e| AppError::DocumentError(anyhow!("Failed to lay out header row: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn renderer() -> PdfRenderer {
        PdfRenderer::new("/tmp/fonts", "TestSans", "http://localhost:8000/uploads")
    }

    #[test]
    fn currency_formatting_groups_thousands() {
        assert_eq!(format_currency(dec("1234567.891")), "1,234,567.89");
        assert_eq!(format_currency(dec("20")), "20.00");
        assert_eq!(format_currency(dec("999.5")), "999.50");
        assert_eq!(format_currency(dec("-1234.56")), "-1,234.56");
        assert_eq!(format_currency(dec("0")), "0.00");
    }

    #[test]
    fn image_url_derives_from_product_id() {
        let r = renderer();
        assert_eq!(
            r.image_url(Some(42)),
            "http://localhost:8000/uploads/producto_42.jpeg"
        );
        assert_eq!(
            r.image_url(None),
            "http://localhost:8000/uploads/default-image.jpeg"
        );
    }
}

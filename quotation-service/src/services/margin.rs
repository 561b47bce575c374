//! Profit-margin calculator for quotation line items.
//!
//! A line may carry a profit percentage, a profit amount, both, or neither.
//! The two representations are linked by
//! `amount = (cost_basis or unit_price) * quantity * percent / 100`.
//! Whichever side is missing is derived; when both are supplied they must
//! agree within [`MARGIN_TOLERANCE`]. All arithmetic is exact decimal.

use anyhow::anyhow;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use service_core::error::AppError;

/// Absolute tolerance for the consistency cross-check, in currency units.
pub static MARGIN_TOLERANCE: Lazy<Decimal> = Lazy::new(|| Decimal::new(1, 2)); // 0.01

static HUNDRED: Lazy<Decimal> = Lazy::new(|| Decimal::from(100));

/// A consistent (percentage, amount) pair for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margin {
    pub percent: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// Resolves the margin fields of a line item.
///
/// `cost_basis` takes precedence over `unit_price` as the base when present.
/// Fails with a validation error when a derivation is needed but the base
/// (`quantity` times cost or price) is zero, or when both fields are given
/// and disagree beyond the tolerance. Neither supplied value is ever
/// silently overwritten.
pub fn resolve_margin(
    quantity: Decimal,
    unit_price: Decimal,
    cost_basis: Option<Decimal>,
    percent: Option<Decimal>,
    amount: Option<Decimal>,
) -> Result<Margin, AppError> {
    if percent.is_none() && amount.is_none() {
        return Ok(Margin {
            percent: None,
            amount: None,
        });
    }

    let base = cost_basis.unwrap_or(unit_price) * quantity;

    match (percent, amount) {
        (Some(p), Some(a)) => {
            let expected = base * p / *HUNDRED;
            if (a - expected).abs() > *MARGIN_TOLERANCE {
                return Err(AppError::BadRequest(anyhow!(
                    "Inconsistent margin fields: amount {} does not match {}% of base {}",
                    a,
                    p,
                    base
                )));
            }
            Ok(Margin {
                percent: Some(p),
                amount: Some(a),
            })
        }
        (Some(p), None) => {
            if quantity.is_zero() {
                return Err(AppError::BadRequest(anyhow!(
                    "Cannot derive margin amount with zero quantity"
                )));
            }
            Ok(Margin {
                percent: Some(p),
                amount: Some(base * p / *HUNDRED),
            })
        }
        (None, Some(a)) => {
            if quantity.is_zero() {
                return Err(AppError::BadRequest(anyhow!(
                    "Cannot derive margin percentage with zero quantity"
                )));
            }
            if base.is_zero() {
                return Err(AppError::BadRequest(anyhow!(
                    "Cannot derive margin percentage with a zero cost basis and price"
                )));
            }
            Ok(Margin {
                percent: Some(a / base * *HUNDRED),
                amount: Some(a),
            })
        }
        (None, None) => unreachable!(),
    }
}

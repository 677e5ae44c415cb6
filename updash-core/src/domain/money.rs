//! Money values in integer minor units

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default currency for Up Banking accounts
pub const DEFAULT_CURRENCY: &str = "AUD";

/// A money value as the Up API returns it
///
/// `value_in_base_units` (cents) is the only field used for arithmetic; the
/// decimal string `value` is kept for display fidelity only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonetaryAmount {
    pub currency_code: String,
    #[serde(default)]
    pub value: String,
    pub value_in_base_units: i64,
}

impl MonetaryAmount {
    pub fn new(value_in_base_units: i64, currency_code: impl Into<String>) -> Self {
        Self {
            currency_code: currency_code.into(),
            value: Decimal::new(value_in_base_units, 2).to_string(),
            value_in_base_units,
        }
    }

    pub fn is_income(&self) -> bool {
        self.value_in_base_units > 0
    }

    pub fn is_spending(&self) -> bool {
        self.value_in_base_units < 0
    }

    /// Format with currency code, keeping the sign
    pub fn format(&self) -> String {
        format_minor_units(self.value_in_base_units, &self.currency_code)
    }
}

/// Format a minor-unit sum as a major-unit string, e.g. `-AUD 5.00`
pub fn format_minor_units(value_in_base_units: i64, currency_code: &str) -> String {
    let amount = Decimal::new(value_in_base_units, 2);
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{} {:.2}", currency_code, amount.abs())
    } else {
        format!("{} {:.2}", currency_code, amount)
    }
}

/// Format a signed spending sum as a positive amount
///
/// Spending is stored as a negative sum; this is the one place it flips.
pub fn format_spending(signed_spending: i64, currency_code: &str) -> String {
    format_minor_units(signed_spending.saturating_abs(), currency_code)
}

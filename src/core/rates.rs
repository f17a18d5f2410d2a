//! Permitted VAT rate percentages.
//!
//! The defaults are the three tiers of the 10 / 15 / 21 % regime. Other
//! jurisdictions supply their own table, either in code or deserialised
//! from configuration:
//!
//! ```
//! use vat_ledger::RateTable;
//! use rust_decimal_macros::dec;
//!
//! let table = RateTable::tiered(dec!(7), dec!(7), dec!(19)).unwrap();
//! assert!(table.is_valid(dec!(19)));
//! assert!(!table.is_valid(dec!(21)));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::TaxError;

/// Reduced tier of the default table.
pub const LOW_PERCENT: Decimal = dec!(10);

/// Second reduced tier of the default table.
pub const MEDIUM_PERCENT: Decimal = dec!(15);

/// Standard tier of the default table.
pub const HIGH_PERCENT: Decimal = dec!(21);

/// Immutable set of VAT percentages a line item may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Decimal>", into = "Vec<Decimal>")]
pub struct RateTable {
    rates: Vec<Decimal>,
}

impl RateTable {
    /// Build a table from the given percentages.
    ///
    /// Rejects an empty list, negative percentages, and duplicates
    /// (`15` and `15.0` count as the same rate).
    pub fn new(rates: impl IntoIterator<Item = Decimal>) -> Result<Self, TaxError> {
        let mut table: Vec<Decimal> = Vec::new();
        for rate in rates {
            if rate.is_sign_negative() && !rate.is_zero() {
                return Err(TaxError::InvalidRateTable(format!(
                    "rate {rate} is negative"
                )));
            }
            if table.contains(&rate) {
                return Err(TaxError::InvalidRateTable(format!(
                    "rate {rate} is listed twice"
                )));
            }
            table.push(rate);
        }
        if table.is_empty() {
            return Err(TaxError::InvalidRateTable(
                "at least one rate is required".into(),
            ));
        }
        Ok(Self { rates: table })
    }

    /// Three-tier table (low / medium / high). Tiers may coincide.
    pub fn tiered(low: Decimal, medium: Decimal, high: Decimal) -> Result<Self, TaxError> {
        let mut tiers = vec![low];
        for rate in [medium, high] {
            if !tiers.contains(&rate) {
                tiers.push(rate);
            }
        }
        Self::new(tiers)
    }

    /// Whether `rate` is one of the permitted percentages.
    pub fn is_valid(&self, rate: Decimal) -> bool {
        self.rates.contains(&rate)
    }

    /// Permitted percentages in configuration order.
    pub fn rates(&self) -> &[Decimal] {
        &self.rates
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            rates: vec![LOW_PERCENT, MEDIUM_PERCENT, HIGH_PERCENT],
        }
    }
}

impl TryFrom<Vec<Decimal>> for RateTable {
    type Error = TaxError;

    fn try_from(rates: Vec<Decimal>) -> Result<Self, Self::Error> {
        Self::new(rates)
    }
}

impl From<RateTable> for Vec<Decimal> {
    fn from(table: RateTable) -> Self {
        table.rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers() {
        let table = RateTable::default();
        assert_eq!(table.rates(), &[dec!(10), dec!(15), dec!(21)]);
        assert!(table.is_valid(dec!(21)));
        assert!(table.is_valid(dec!(21.00)));
        assert!(!table.is_valid(dec!(19)));
        assert!(!table.is_valid(dec!(0)));
    }

    #[test]
    fn zero_rate_allowed_when_configured() {
        let table = RateTable::new([dec!(0), dec!(7), dec!(19)]).unwrap();
        assert!(table.is_valid(dec!(0)));
    }

    #[test]
    fn rejects_negative() {
        let err = RateTable::new([dec!(10), dec!(-5)]).unwrap_err();
        assert!(matches!(err, TaxError::InvalidRateTable(_)));
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        assert!(RateTable::new([dec!(15), dec!(15.0)]).is_err());
        assert!(RateTable::new(Vec::new()).is_err());
    }

    #[test]
    fn tiered_collapses_equal_tiers() {
        let table = RateTable::tiered(dec!(7), dec!(7), dec!(19)).unwrap();
        assert_eq!(table.rates(), &[dec!(7), dec!(19)]);
    }
}

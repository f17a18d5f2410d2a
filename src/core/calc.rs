//! VAT arithmetic.
//!
//! Gross is derived from net by multiplying with the VAT ratio. Net is
//! derived from gross with the coefficient method: the VAT amount
//! `gross × coefficient` is rounded to cents first and then subtracted.
//! This differs from `gross / ratio` in the last cent and is how VAT is
//! back-calculated on official documents.

use rust_decimal::{Decimal, RoundingStrategy};

use super::rates::RateTable;
use super::totals::RateTotals;

/// Round to `dp` decimal places, half away from zero (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Plain price data of one line, as consumed by a [`CalculationStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFigures {
    pub rate: Decimal,
    pub quantity: Decimal,
    pub unit_gross: Decimal,
    pub unit_net: Decimal,
}

/// Rate-parameterised price arithmetic.
///
/// Only [`rate_table`](Self::rate_table) is required; every calculation has
/// a default implementation, so a custom strategy overrides just the steps
/// it changes. A ledger applies its strategy uniformly to all of its lines.
pub trait CalculationStrategy {
    /// Permitted rates for lines created through this strategy.
    fn rate_table(&self) -> &RateTable;

    fn is_valid_rate(&self, rate: Decimal) -> bool {
        self.rate_table().is_valid(rate)
    }

    /// `(100 + rate) / 100`, rounded to 4 places. Net × ratio = gross.
    fn vat_ratio(&self, rate: Decimal) -> Decimal {
        round_half_up((Decimal::ONE_HUNDRED + rate) / Decimal::ONE_HUNDRED, 4)
    }

    /// `rate / (100 + rate)`, rounded to 4 places.
    fn vat_coefficient(&self, rate: Decimal) -> Decimal {
        round_half_up(rate / (Decimal::ONE_HUNDRED + rate), 4)
    }

    /// Not rounded: the full-precision value feeds line totals.
    fn unit_gross_from_net(&self, rate: Decimal, unit_net: Decimal) -> Decimal {
        unit_net * self.vat_ratio(rate)
    }

    fn unit_net_from_gross(&self, rate: Decimal, unit_gross: Decimal) -> Decimal {
        unit_gross - round_half_up(unit_gross * self.vat_coefficient(rate), 2)
    }

    /// Unit gross × quantity, unrounded.
    fn line_total_gross(&self, line: &LineFigures) -> Decimal {
        line.unit_gross * line.quantity
    }

    fn line_total_net(&self, line: &LineFigures) -> Decimal {
        round_half_up(line.unit_net * line.quantity, 2)
    }

    fn line_vat(&self, line: &LineFigures) -> Decimal {
        round_half_up(self.line_total_gross(line) - self.line_total_net(line), 2)
    }

    /// Sum of line net totals per rate.
    fn totals_net_by_rate(&self, lines: &[LineFigures]) -> RateTotals {
        lines
            .iter()
            .map(|line| (line.rate, self.line_total_net(line)))
            .collect()
    }

    /// Gross per rate, derived from the net group total rather than summed
    /// from lines, so `gross = round(net × ratio, 2)` holds for every group.
    fn totals_gross_by_rate(&self, lines: &[LineFigures]) -> RateTotals {
        self.totals_net_by_rate(lines)
            .map(|rate, net| round_half_up(net * self.vat_ratio(rate), 2))
    }
}

/// The default arithmetic bound to a rate table.
#[derive(Debug, Clone, Default)]
pub struct StandardCalculation {
    rates: RateTable,
}

impl StandardCalculation {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }
}

impl CalculationStrategy for StandardCalculation {
    fn rate_table(&self) -> &RateTable {
        &self.rates
    }
}

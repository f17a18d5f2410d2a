use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calc::round_half_up;
use super::totals::RateTotals;

/// A lump discount distributed over a ledger.
///
/// Unlike a line item it carries no rate. To book a discount as a line of
/// its own, add an item with a negative price instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    amount: Decimal,
    /// True when the amount was taken from gross totals, false for net.
    pub applied_to_gross: bool,
}

impl Discount {
    pub fn new(amount: Decimal, applied_to_gross: bool) -> Self {
        Self {
            amount,
            applied_to_gross,
        }
    }

    /// Amount rounded to cents.
    pub fn amount(&self) -> Decimal {
        self.amount_dp(2)
    }

    /// Amount rounded to `dp` decimal places.
    pub fn amount_dp(&self, dp: u32) -> Decimal {
        round_half_up(self.amount, dp)
    }
}

/// Discount taken off one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineDiscount {
    /// Index of the line in the ledger.
    pub index: usize,
    /// Amount subtracted from the unit price.
    pub unit_amount: Decimal,
    pub quantity: Decimal,
}

impl LineDiscount {
    pub fn total(&self) -> Decimal {
        self.unit_amount * self.quantity
    }
}

/// How a discount was split when it was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscountAllocation {
    /// Share of the discount per rate group. Sums to the requested amount.
    pub by_rate: RateTotals,
    /// Per-line deductions in ledger order.
    pub lines: Vec<LineDiscount>,
}

impl DiscountAllocation {
    /// What the lines actually lost, summed over unit amount × quantity.
    ///
    /// Differs from the requested amount by the rounding of each line's
    /// share and unit amount.
    pub fn applied_total(&self) -> Decimal {
        self.lines.iter().map(LineDiscount::total).sum()
    }
}

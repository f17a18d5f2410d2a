//! Plain-text recap of a ledger.
//!
//! [`LineTable`] lists every line, [`TotalsTable`] the per-rate and overall
//! totals, and [`Recap`] prints both. All three only read the ledger.
//!
//! ```
//! use vat_ledger::PriceLedger;
//! use vat_ledger::recap::Recap;
//! use rust_decimal_macros::dec;
//!
//! let mut ledger = PriceLedger::new(dec!(21));
//! ledger.add_with_gross(dec!(121), dec!(1)).unwrap();
//! let text = Recap::new(&ledger).to_string();
//! assert!(text.contains("To pay"));
//! ```

use std::fmt;

use rust_decimal::Decimal;

use crate::core::{CalculationStrategy, PriceLedger, StandardCalculation, round_half_up};

const MONEY_WIDTH: usize = 14;

fn money(value: Decimal) -> String {
    round_half_up(value, 2).to_string()
}

/// A unit price, with the pre-discount value when it differs.
fn price_cell(current: Decimal, original: Decimal) -> String {
    if round_half_up(current, 2) == round_half_up(original, 2) {
        money(current)
    } else {
        format!("{} (was {})", money(current), money(original))
    }
}

/// One row per line: unit gross, quantity, total gross, rate, unit net, total net.
pub struct LineTable<'a, S: CalculationStrategy = StandardCalculation> {
    ledger: &'a PriceLedger<S>,
}

impl<'a, S: CalculationStrategy> LineTable<'a, S> {
    pub fn new(ledger: &'a PriceLedger<S>) -> Self {
        Self { ledger }
    }
}

impl<S: CalculationStrategy> fmt::Display for LineTable<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>3}  {:>24}  {:>8}  {:>w$}  {:>6}  {:>24}  {:>w$}",
            "#",
            "Price with VAT",
            "Quantity",
            "Total with VAT",
            "VAT %",
            "Price without VAT",
            "Total without VAT",
            w = MONEY_WIDTH + 4,
        )?;
        for (position, (_, line)) in self.ledger.iter().enumerate() {
            writeln!(
                f,
                "{:>3}  {:>24}  {:>8}  {:>w$}  {:>6}  {:>24}  {:>w$}",
                position + 1,
                price_cell(line.unit_gross(), line.original_gross()),
                line.quantity().to_string(),
                money(line.total_gross()),
                line.rate().to_string(),
                price_cell(line.unit_net(), line.original_net()),
                money(line.total_net()),
                w = MONEY_WIDTH + 4,
            )?;
        }
        Ok(())
    }
}

/// Per-rate totals, the discount block, grand totals, rounding and amount to pay.
pub struct TotalsTable<'a, S: CalculationStrategy = StandardCalculation> {
    ledger: &'a PriceLedger<S>,
}

impl<'a, S: CalculationStrategy> TotalsTable<'a, S> {
    pub fn new(ledger: &'a PriceLedger<S>) -> Self {
        Self { ledger }
    }
}

impl<S: CalculationStrategy> fmt::Display for TotalsTable<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.ledger.summary();
        let row = |f: &mut fmt::Formatter<'_>, a: &str, b: &str, c: &str, d: &str| {
            writeln!(
                f,
                "{:>6}  {:>w$}  {:>w$}  {:>w$}",
                a,
                b,
                c,
                d,
                w = MONEY_WIDTH + 6
            )
        };

        writeln!(f, "Totals")?;
        row(f, "", "VAT", "Total without VAT", "Total with VAT")?;
        for (rate, vat) in summary.vat_bases.iter() {
            row(
                f,
                &format!("{rate}%"),
                &money(vat),
                &money(summary.totals_net.get(rate).unwrap_or_default()),
                &money(summary.totals_gross.get(rate).unwrap_or_default()),
            )?;
        }
        writeln!(f)?;

        if let Some(discount) = &summary.discount {
            row(
                f,
                "",
                "",
                "Before discount:",
                &money(summary.total_gross_before_discount),
            )?;
            row(f, "", "", "Discount:", &discount.amount().to_string())?;
            writeln!(f)?;
        }

        row(f, "", "Total VAT", "Total without VAT", "Total with VAT")?;
        row(
            f,
            "",
            &money(summary.total_vat),
            &money(summary.total_net),
            &money(summary.total_gross),
        )?;
        writeln!(f)?;
        row(f, "", "", "Rounding:", &summary.rounding.to_string())?;
        row(f, "", "", "To pay:", &summary.total_gross_rounded.to_string())
    }
}

/// Line table followed by the totals table.
pub struct Recap<'a, S: CalculationStrategy = StandardCalculation> {
    ledger: &'a PriceLedger<S>,
}

impl<'a, S: CalculationStrategy> Recap<'a, S> {
    pub fn new(ledger: &'a PriceLedger<S>) -> Self {
        Self { ledger }
    }
}

impl<S: CalculationStrategy> fmt::Display for Recap<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", LineTable::new(self.ledger))?;
        writeln!(f)?;
        write!(f, "{}", TotalsTable::new(self.ledger))
    }
}

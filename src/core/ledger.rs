use std::collections::{BTreeMap, HashMap, btree_map};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, trace};

use super::calc::{CalculationStrategy, LineFigures, StandardCalculation, round_half_up};
use super::discount::{Discount, DiscountAllocation, LineDiscount};
use super::error::TaxError;
use super::item::LineItem;
use super::totals::RateTotals;

/// Ordered list of priced lines with per-rate totals and discount
/// distribution.
///
/// ```
/// use vat_ledger::{NewLine, PriceLedger};
/// use rust_decimal_macros::dec;
///
/// let mut ledger = PriceLedger::new(dec!(21));
/// ledger.add_with_gross(dec!(121), dec!(1)).unwrap();
/// ledger.add(NewLine::gross(dec!(200)).quantity(dec!(2)).rate(dec!(15))).unwrap();
///
/// assert_eq!(ledger.rates_present(), vec![dec!(21), dec!(15)]);
/// assert_eq!(ledger.total_gross(), dec!(521.01));
/// ```
///
/// A ledger is meant for a single owner. Reads traverse line state that
/// [`apply_discount`](Self::apply_discount) mutates.
#[derive(Debug, Clone)]
pub struct PriceLedger<S: CalculationStrategy = StandardCalculation> {
    default_rate: Decimal,
    calc: S,
    lines: BTreeMap<usize, LineItem>,
    ids: HashMap<String, usize>,
    discount: Option<Discount>,
    gross_before_discount: RateTotals,
    net_before_discount: RateTotals,
}

/// Parameters for a new ledger line.
#[derive(Debug, Clone)]
pub struct NewLine {
    gross: Option<Decimal>,
    net: Option<Decimal>,
    quantity: Decimal,
    rate: Option<Decimal>,
    id: Option<String>,
}

impl NewLine {
    /// Line priced with a unit price including VAT.
    pub fn gross(price: Decimal) -> Self {
        Self {
            gross: Some(price),
            net: None,
            quantity: Decimal::ONE,
            rate: None,
            id: None,
        }
    }

    /// Line priced with a unit price excluding VAT.
    pub fn net(price: Decimal) -> Self {
        Self {
            gross: None,
            net: Some(price),
            quantity: Decimal::ONE,
            rate: None,
            id: None,
        }
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// Overrides the ledger's default rate.
    pub fn rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Registers the line for lookup with [`PriceLedger::get_by_id`].
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Read-only view of a line bound to its ledger's strategy.
pub struct LineView<'a, S: CalculationStrategy + ?Sized = StandardCalculation> {
    item: &'a LineItem,
    calc: &'a S,
}

impl<S: CalculationStrategy + ?Sized> Clone for LineView<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: CalculationStrategy + ?Sized> Copy for LineView<'_, S> {}

impl<S: CalculationStrategy + ?Sized> std::fmt::Debug for LineView<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineView").field("item", self.item).finish()
    }
}

impl<'a, S: CalculationStrategy + ?Sized> LineView<'a, S> {
    pub fn item(&self) -> &'a LineItem {
        self.item
    }

    pub fn rate(&self) -> Decimal {
        self.item.rate()
    }

    pub fn quantity(&self) -> Decimal {
        self.item.quantity()
    }

    pub fn unit_gross(&self) -> Decimal {
        self.item.unit_gross(self.calc)
    }

    pub fn unit_net(&self) -> Decimal {
        self.item.unit_net(self.calc)
    }

    /// Unit gross before discount. Equal to the current price when none
    /// was applied.
    pub fn original_gross(&self) -> Decimal {
        let current = self.unit_gross();
        self.item.original_gross().unwrap_or(current)
    }

    /// Unit net before discount. Equal to the current price when none
    /// was applied.
    pub fn original_net(&self) -> Decimal {
        let current = self.unit_net();
        self.item.original_net().unwrap_or(current)
    }

    pub fn total_gross(&self) -> Decimal {
        self.item.total_gross(self.calc)
    }

    pub fn total_net(&self) -> Decimal {
        self.item.total_net(self.calc)
    }

    pub fn line_vat(&self) -> Decimal {
        self.item.line_vat(self.calc)
    }

    pub fn is_discounted(&self) -> bool {
        self.item.is_discounted()
    }
}

/// Iterator over the occupied slots of a ledger, in index order.
pub struct Lines<'a, S: CalculationStrategy> {
    inner: btree_map::Iter<'a, usize, LineItem>,
    calc: &'a S,
}

impl<'a, S: CalculationStrategy> Iterator for Lines<'a, S> {
    type Item = (usize, LineView<'a, S>);

    fn next(&mut self) -> Option<Self::Item> {
        let calc = self.calc;
        self.inner
            .next()
            .map(|(&index, item)| (index, LineView { item, calc }))
    }
}

/// Ledger-level figures in one serialisable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub totals_net: RateTotals,
    pub totals_gross: RateTotals,
    pub vat_bases: RateTotals,
    pub total_net: Decimal,
    pub total_gross: Decimal,
    pub total_vat: Decimal,
    /// Gross total rounded to whole currency units.
    pub total_gross_rounded: Decimal,
    pub rounding: Decimal,
    pub discount: Option<Discount>,
    pub total_gross_before_discount: Decimal,
    pub total_net_before_discount: Decimal,
}

impl PriceLedger<StandardCalculation> {
    /// Ledger using the default rate table and arithmetic.
    pub fn new(default_rate: Decimal) -> Self {
        Self::with_strategy(default_rate, StandardCalculation::default())
    }
}

impl<S: CalculationStrategy> PriceLedger<S> {
    pub fn with_strategy(default_rate: Decimal, calc: S) -> Self {
        Self {
            default_rate,
            calc,
            lines: BTreeMap::new(),
            ids: HashMap::new(),
            discount: None,
            gross_before_discount: RateTotals::new(),
            net_before_discount: RateTotals::new(),
        }
    }

    pub fn default_rate(&self) -> Decimal {
        self.default_rate
    }

    pub fn strategy(&self) -> &S {
        &self.calc
    }

    /// Append a line at the default rate, priced including VAT.
    pub fn add_with_gross(
        &mut self,
        gross: Decimal,
        quantity: Decimal,
    ) -> Result<LineView<'_, S>, TaxError> {
        self.add(NewLine::gross(gross).quantity(quantity))
    }

    /// Append a line at the default rate, priced excluding VAT.
    pub fn add_with_net(
        &mut self,
        net: Decimal,
        quantity: Decimal,
    ) -> Result<LineView<'_, S>, TaxError> {
        self.add(NewLine::net(net).quantity(quantity))
    }

    /// Append a line one past the highest occupied index. A given id
    /// replaces any earlier line registered under it in the lookup map;
    /// that line stays in the ledger.
    pub fn add(&mut self, line: NewLine) -> Result<LineView<'_, S>, TaxError> {
        let index = match self.lines.last_key_value() {
            Some((&last, _)) => last.checked_add(1).ok_or(TaxError::IndexExhausted(last))?,
            None => 0,
        };
        let (item, id) = self.build(line)?;
        trace!(index, rate = %item.rate(), quantity = %item.quantity(), "adding line");
        if let Some(id) = id {
            self.ids.insert(id, index);
        }
        let item = self.lines.entry(index).or_insert(item);
        Ok(LineView {
            item,
            calc: &self.calc,
        })
    }

    pub fn get_by_id(&self, id: &str) -> Option<LineView<'_, S>> {
        self.ids.get(id).and_then(|&index| self.view(index))
    }

    pub fn get(&self, index: usize) -> Option<LineView<'_, S>> {
        self.view(index)
    }

    /// Whether `index` holds a line.
    pub fn contains(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }

    /// Build `line` like [`add`](Self::add) and store it at `index`, which
    /// may lie anywhere past the end. Returns the replaced line; ids that
    /// pointed at it are dropped.
    pub fn set(&mut self, index: usize, line: NewLine) -> Result<Option<LineItem>, TaxError> {
        let (item, id) = self.build(line)?;
        trace!(index, rate = %item.rate(), "setting line");
        let previous = self.lines.insert(index, item);
        if previous.is_some() {
            self.forget_ids(index);
        }
        if let Some(id) = id {
            self.ids.insert(id, index);
        }
        Ok(previous)
    }

    /// Remove the line at `index`. Other lines keep their indices.
    pub fn unset(&mut self, index: usize) -> Option<LineItem> {
        let removed = self.lines.remove(&index);
        if removed.is_some() {
            self.forget_ids(index);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lines in index order. Call again to restart.
    pub fn iter(&self) -> Lines<'_, S> {
        Lines {
            inner: self.lines.iter(),
            calc: &self.calc,
        }
    }

    pub fn totals_gross(&self) -> RateTotals {
        self.calc.totals_gross_by_rate(&self.figures())
    }

    pub fn totals_net(&self) -> RateTotals {
        self.calc.totals_net_by_rate(&self.figures())
    }

    pub fn total_gross(&self) -> Decimal {
        self.totals_gross().total()
    }

    pub fn total_net(&self) -> Decimal {
        self.totals_net().total()
    }

    pub fn total_vat(&self) -> Decimal {
        self.total_gross() - self.total_net()
    }

    /// Gross total rounded to `precision` places; 0 means whole units.
    pub fn total_gross_rounded(&self, precision: u32) -> Decimal {
        round_half_up(self.total_gross(), precision)
    }

    /// Signed adjustment from the exact to the rounded gross total.
    pub fn rounding(&self, precision: u32) -> Decimal {
        round_half_up(self.total_gross_rounded(precision) - self.total_gross(), 4)
    }

    /// VAT per rate: gross group total minus net group total.
    pub fn vat_bases(&self) -> RateTotals {
        let figures = self.figures();
        let net = self.calc.totals_net_by_rate(&figures);
        self.calc
            .totals_gross_by_rate(&figures)
            .map(|rate, gross| gross - net.get(rate).unwrap_or_default())
    }

    /// Distinct rates in order of first appearance.
    pub fn rates_present(&self) -> Vec<Decimal> {
        let mut rates: Vec<Decimal> = Vec::new();
        for item in self.lines.values() {
            if !rates.contains(&item.rate()) {
                rates.push(item.rate());
            }
        }
        rates
    }

    /// Distribute `amount` over all lines in proportion to their totals.
    ///
    /// Each rate group gets `amount × round(group / total, 4)`. Whatever
    /// the rounded ratios leave over goes to the first rate group, so the
    /// group shares sum to `amount` exactly. Each line then loses
    /// `round(group share × round(line / group, 2) / quantity, 2)` per unit.
    /// The sum over lines can miss `amount` by a few cents per group.
    ///
    /// Replaces any earlier discount record. Fails without touching any
    /// line when `amount` is negative or exceeds the total.
    #[tracing::instrument(level = "debug", skip(self), fields(lines = self.len()))]
    pub fn apply_discount(
        &mut self,
        amount: Decimal,
        on_gross: bool,
    ) -> Result<DiscountAllocation, TaxError> {
        if amount < Decimal::ZERO {
            debug!("rejected negative discount");
            return Err(TaxError::NegativeDiscount(amount));
        }

        let figures = self.figures();
        let totals_net = self.calc.totals_net_by_rate(&figures);
        let totals_gross = self.calc.totals_gross_by_rate(&figures);
        let totals = if on_gross { &totals_gross } else { &totals_net };
        let ledger_total = totals.total();

        if amount > ledger_total {
            debug!(%ledger_total, "rejected discount above total");
            return Err(TaxError::DiscountExceedsTotal {
                amount,
                total: ledger_total,
            });
        }

        let mut by_rate = totals.map(|_, group_total| {
            if ledger_total.is_zero() {
                return Decimal::ZERO;
            }
            let ratio = round_half_up(
                group_total * Decimal::ONE_HUNDRED / ledger_total / Decimal::ONE_HUNDRED,
                4,
            );
            amount * ratio
        });

        let remainder = amount - by_rate.total();
        if !remainder.is_zero() {
            if let Some((rate, share)) = by_rate.first_mut() {
                debug!(%remainder, %rate, "assigning remainder to first rate group");
                *share += remainder;
            }
        }
        debug!(?by_rate, "group shares");

        let mut allocation = DiscountAllocation {
            by_rate,
            lines: Vec::with_capacity(figures.len()),
        };
        for (&index, item) in self.lines.iter_mut() {
            let line = item.figures(&self.calc);
            let line_total = if on_gross {
                self.calc.line_total_gross(&line)
            } else {
                self.calc.line_total_net(&line)
            };
            let group_total = totals.get(line.rate).unwrap_or_default();
            let line_ratio = if group_total.is_zero() {
                Decimal::ZERO
            } else {
                round_half_up(
                    line_total * Decimal::ONE_HUNDRED / group_total / Decimal::ONE_HUNDRED,
                    2,
                )
            };
            let group_share = allocation.by_rate.get(line.rate).unwrap_or_default();
            let unit_amount = round_half_up(group_share * line_ratio / line.quantity, 2);

            item.apply_discount(&self.calc, unit_amount, on_gross);
            allocation.lines.push(LineDiscount {
                index,
                unit_amount,
                quantity: line.quantity,
            });
        }

        self.gross_before_discount = totals_gross;
        self.net_before_discount = totals_net;
        self.discount = Some(Discount::new(amount, on_gross));
        debug!(applied = %allocation.applied_total(), "discount applied");
        Ok(allocation)
    }

    pub fn discount(&self) -> Option<&Discount> {
        self.discount.as_ref()
    }

    pub fn has_discount(&self) -> bool {
        self.discount.is_some()
    }

    /// Per-rate gross totals captured by the last discount.
    pub fn totals_gross_before_discount(&self) -> &RateTotals {
        &self.gross_before_discount
    }

    /// Per-rate net totals captured by the last discount.
    pub fn totals_net_before_discount(&self) -> &RateTotals {
        &self.net_before_discount
    }

    /// Zero if no discount was applied.
    pub fn total_gross_before_discount(&self) -> Decimal {
        self.gross_before_discount.total()
    }

    /// Zero if no discount was applied.
    pub fn total_net_before_discount(&self) -> Decimal {
        self.net_before_discount.total()
    }

    pub fn summary(&self) -> LedgerSummary {
        let totals_net = self.totals_net();
        let totals_gross = self.totals_gross();
        let vat_bases =
            totals_gross.map(|rate, gross| gross - totals_net.get(rate).unwrap_or_default());
        let total_net = totals_net.total();
        let total_gross = totals_gross.total();
        let total_gross_rounded = round_half_up(total_gross, 0);

        LedgerSummary {
            total_vat: total_gross - total_net,
            rounding: round_half_up(total_gross_rounded - total_gross, 4),
            totals_net,
            totals_gross,
            vat_bases,
            total_net,
            total_gross,
            total_gross_rounded,
            discount: self.discount,
            total_gross_before_discount: self.total_gross_before_discount(),
            total_net_before_discount: self.total_net_before_discount(),
        }
    }

    /// Drop all lines, ids, the discount and the before-discount totals.
    pub fn clear(&mut self) {
        trace!(lines = self.len(), "clearing ledger");
        self.lines.clear();
        self.ids.clear();
        self.discount = None;
        self.gross_before_discount = RateTotals::new();
        self.net_before_discount = RateTotals::new();
    }

    fn build(&self, line: NewLine) -> Result<(LineItem, Option<String>), TaxError> {
        let rate = line.rate.unwrap_or(self.default_rate);
        let item = LineItem::new(&self.calc, rate, line.gross, line.net, line.quantity)?;
        Ok((item, line.id))
    }

    fn view(&self, index: usize) -> Option<LineView<'_, S>> {
        self.lines.get(&index).map(|item| LineView {
            item,
            calc: &self.calc,
        })
    }

    fn figures(&self) -> Vec<LineFigures> {
        self.lines
            .values()
            .map(|item| item.figures(&self.calc))
            .collect()
    }

    fn forget_ids(&mut self, index: usize) {
        self.ids.retain(|_, i| *i != index);
    }
}

impl<'a, S: CalculationStrategy> IntoIterator for &'a PriceLedger<S> {
    type Item = (usize, LineView<'a, S>);
    type IntoIter = Lines<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::RateTable;
    use rust_decimal_macros::dec;

    #[test]
    fn ids_resolve_to_lines() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add(NewLine::gross(dec!(121)).id("a")).unwrap();
        ledger.add(NewLine::net(dec!(100)).rate(dec!(10)).id("b")).unwrap();
        ledger.add_with_gross(dec!(5), dec!(1)).unwrap();

        assert_eq!(ledger.get_by_id("b").unwrap().rate(), dec!(10));
        assert_eq!(ledger.get_by_id("a").unwrap().unit_gross(), dec!(121));
        assert!(ledger.get_by_id("c").is_none());
    }

    #[test]
    fn reused_id_points_at_newest_line() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add(NewLine::gross(dec!(1)).id("x")).unwrap();
        ledger.add(NewLine::gross(dec!(2)).id("x")).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get_by_id("x").unwrap().unit_gross(), dec!(2));
    }

    #[test]
    fn unset_leaves_hole_and_drops_id() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add(NewLine::gross(dec!(1))).unwrap();
        ledger.add(NewLine::gross(dec!(2)).id("two")).unwrap();
        ledger.add(NewLine::gross(dec!(3))).unwrap();

        assert!(ledger.unset(1).is_some());
        assert!(ledger.unset(1).is_none());
        assert!(!ledger.contains(1));
        assert!(ledger.contains(2));
        assert!(ledger.get_by_id("two").is_none());
        assert_eq!(ledger.len(), 2);

        let seen: Vec<usize> = ledger.iter().map(|(i, _)| i).collect();
        assert_eq!(seen, vec![0, 2]);
    }

    #[test]
    fn set_replaces_and_leaves_gaps() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add(NewLine::gross(dec!(1)).id("one")).unwrap();

        let old = ledger.set(0, NewLine::gross(dec!(10))).unwrap().unwrap();
        assert_eq!(old.unit_gross(&StandardCalculation::default()), dec!(1));
        assert!(ledger.get_by_id("one").is_none());

        assert!(ledger.set(3, NewLine::gross(dec!(30)).id("three")).unwrap().is_none());
        assert!(!ledger.contains(1));
        assert!(!ledger.contains(2));
        assert_eq!(ledger.get(3).unwrap().unit_gross(), dec!(30));
        assert_eq!(ledger.get_by_id("three").unwrap().unit_gross(), dec!(30));
        assert_eq!(ledger.len(), 2);

        ledger.add_with_gross(dec!(40), dec!(1)).unwrap();
        assert!(ledger.contains(4));
    }

    #[test]
    fn set_validates_against_ledger_strategy() {
        let table = RateTable::new([dec!(0), dec!(7), dec!(19)]).unwrap();
        let mut ledger = PriceLedger::with_strategy(dec!(19), StandardCalculation::new(table));
        ledger.add_with_gross(dec!(119), dec!(1)).unwrap();

        let err = ledger.set(0, NewLine::gross(dec!(121)).rate(dec!(21))).unwrap_err();
        assert_eq!(err, TaxError::InvalidRate(dec!(21)));
        assert_eq!(
            ledger.set(1, NewLine::gross(dec!(1)).quantity(dec!(0))).unwrap_err(),
            TaxError::InvalidQuantity(dec!(0))
        );
        assert_eq!(ledger.rates_present(), vec![dec!(19)]);
        assert_eq!(ledger.get(0).unwrap().unit_gross(), dec!(119));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn set_at_largest_index_stays_sparse() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add_with_gross(dec!(1), dec!(1)).unwrap();
        assert!(ledger.set(usize::MAX, NewLine::gross(dec!(2))).unwrap().is_none());
        ledger.set(usize::MAX / 2, NewLine::gross(dec!(3))).unwrap();

        assert_eq!(ledger.len(), 3);
        let seen: Vec<usize> = ledger.iter().map(|(i, _)| i).collect();
        assert_eq!(seen, vec![0, usize::MAX / 2, usize::MAX]);
        assert_eq!(ledger.total_gross(), dec!(6));
        assert_eq!(
            ledger.add_with_gross(dec!(4), dec!(1)).unwrap_err(),
            TaxError::IndexExhausted(usize::MAX)
        );
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn iteration_restarts_with_fresh_iterator() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add_with_gross(dec!(1), dec!(1)).unwrap();
        ledger.add_with_gross(dec!(2), dec!(1)).unwrap();

        let mut lines = ledger.iter();
        assert!(lines.next().is_some());
        assert!(lines.next().is_some());
        assert!(lines.next().is_none());
        assert_eq!((&ledger).into_iter().count(), 2);
    }

    #[test]
    fn empty_ledger_totals_are_zero() {
        let ledger = PriceLedger::new(dec!(21));
        assert_eq!(ledger.total_gross(), Decimal::ZERO);
        assert_eq!(ledger.total_net(), Decimal::ZERO);
        assert_eq!(ledger.total_vat(), Decimal::ZERO);
        assert_eq!(ledger.rounding(0), Decimal::ZERO);
        assert!(ledger.rates_present().is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn rejected_discount_changes_nothing() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add_with_gross(dec!(121), dec!(1)).unwrap();

        let err = ledger.apply_discount(dec!(121), false).unwrap_err();
        assert_eq!(
            err,
            TaxError::DiscountExceedsTotal {
                amount: dec!(121),
                total: dec!(99.99),
            }
        );
        assert_eq!(
            ledger.apply_discount(dec!(-1), true).unwrap_err(),
            TaxError::NegativeDiscount(dec!(-1))
        );
        assert!(!ledger.has_discount());
        assert!(!ledger.get(0).unwrap().is_discounted());
        assert_eq!(ledger.total_gross_before_discount(), Decimal::ZERO);
    }

    #[test]
    fn single_line_takes_whole_discount() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add_with_net(dec!(100), dec!(1)).unwrap();

        let alloc = ledger.apply_discount(dec!(10), false).unwrap();
        assert_eq!(alloc.by_rate.get(dec!(21)), Some(dec!(10)));
        assert_eq!(alloc.applied_total(), dec!(10));
        assert_eq!(ledger.total_net(), dec!(90));
        assert_eq!(ledger.total_gross(), dec!(108.90));
        assert_eq!(ledger.total_net_before_discount(), dec!(100));
        assert_eq!(ledger.totals_gross_before_discount().get(dec!(21)), Some(dec!(121)));
    }

    #[test]
    fn clear_resets_everything() {
        let mut ledger = PriceLedger::new(dec!(21));
        ledger.add(NewLine::gross(dec!(121)).id("a")).unwrap();
        ledger.apply_discount(dec!(21), true).unwrap();
        ledger.clear();

        assert!(ledger.is_empty());
        assert!(!ledger.has_discount());
        assert!(ledger.get_by_id("a").is_none());
        assert_eq!(ledger.total_gross_before_discount(), Decimal::ZERO);
        assert_eq!(ledger.total_gross(), Decimal::ZERO);
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Amounts keyed by VAT rate, ordered by the first time each rate was seen.
///
/// Rates compare numerically, so `21` and `21.00` share one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTotals(Vec<(Decimal, Decimal)>);

impl RateTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the entry for `rate`, creating it at the end if absent.
    pub fn add(&mut self, rate: Decimal, amount: Decimal) {
        match self.0.iter_mut().find(|(r, _)| *r == rate) {
            Some((_, total)) => *total += amount,
            None => self.0.push((rate, amount)),
        }
    }

    pub fn get(&self, rate: Decimal) -> Option<Decimal> {
        self.0.iter().find(|(r, _)| *r == rate).map(|(_, t)| *t)
    }

    pub fn get_mut(&mut self, rate: Decimal) -> Option<&mut Decimal> {
        self.0.iter_mut().find(|(r, _)| *r == rate).map(|(_, t)| t)
    }

    /// The entry of the first rate seen.
    pub fn first_mut(&mut self) -> Option<(Decimal, &mut Decimal)> {
        self.0.first_mut().map(|(r, t)| (*r, t))
    }

    /// Rates in insertion order.
    pub fn rates(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.0.iter().map(|(r, _)| *r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.0.iter().copied()
    }

    /// Sum over all rates.
    pub fn total(&self) -> Decimal {
        self.0.iter().map(|(_, t)| *t).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply `f` to every amount, keeping the rate order.
    pub fn map(&self, mut f: impl FnMut(Decimal, Decimal) -> Decimal) -> Self {
        Self(self.0.iter().map(|&(r, t)| (r, f(r, t))).collect())
    }
}

impl FromIterator<(Decimal, Decimal)> for RateTotals {
    fn from_iter<I: IntoIterator<Item = (Decimal, Decimal)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (rate, amount) in iter {
            totals.add(rate, amount);
        }
        totals
    }
}

use std::cell::OnceCell;

use rust_decimal::Decimal;

use super::calc::{CalculationStrategy, LineFigures};
use super::error::TaxError;

/// Unit price anchored on the side that was entered or last discounted.
/// The other side is derived on first read and cached until the next
/// discount replaces the anchor.
#[derive(Debug, Clone)]
enum UnitPrice {
    Gross { gross: Decimal, net: OnceCell<Decimal> },
    Net { net: Decimal, gross: OnceCell<Decimal> },
}

/// A single priced line: unit price, quantity and VAT rate.
///
/// Only the entered side of the price is stored up front. Derived
/// accessors take the [`CalculationStrategy`] the line was validated
/// against; inside a ledger use [`LineView`](super::LineView), which
/// supplies it.
#[derive(Debug, Clone)]
pub struct LineItem {
    rate: Decimal,
    quantity: Decimal,
    price: UnitPrice,
    original_gross: OnceCell<Decimal>,
    original_net: OnceCell<Decimal>,
    discounted: bool,
}

impl LineItem {
    /// Create a line from either or both unit prices.
    ///
    /// When both are given they are taken as-is and nothing is derived.
    pub fn new<S: CalculationStrategy + ?Sized>(
        calc: &S,
        rate: Decimal,
        gross: Option<Decimal>,
        net: Option<Decimal>,
        quantity: Decimal,
    ) -> Result<Self, TaxError> {
        let price = match (gross, net) {
            (None, None) => return Err(TaxError::MissingPrice),
            (Some(gross), net) => UnitPrice::Gross {
                gross,
                net: net.map(OnceCell::from).unwrap_or_default(),
            },
            (None, Some(net)) => UnitPrice::Net {
                net,
                gross: OnceCell::new(),
            },
        };
        if !calc.is_valid_rate(rate) {
            return Err(TaxError::InvalidRate(rate));
        }
        if quantity <= Decimal::ZERO {
            return Err(TaxError::InvalidQuantity(quantity));
        }

        Ok(Self {
            rate,
            quantity,
            price,
            original_gross: gross.map(OnceCell::from).unwrap_or_default(),
            original_net: net.map(OnceCell::from).unwrap_or_default(),
            discounted: false,
        })
    }

    pub fn from_gross<S: CalculationStrategy + ?Sized>(
        calc: &S,
        rate: Decimal,
        gross: Decimal,
        quantity: Decimal,
    ) -> Result<Self, TaxError> {
        Self::new(calc, rate, Some(gross), None, quantity)
    }

    pub fn from_net<S: CalculationStrategy + ?Sized>(
        calc: &S,
        rate: Decimal,
        net: Decimal,
        quantity: Decimal,
    ) -> Result<Self, TaxError> {
        Self::new(calc, rate, None, Some(net), quantity)
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Unit price including VAT, derived from net on first read.
    pub fn unit_gross<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> Decimal {
        match &self.price {
            UnitPrice::Gross { gross, .. } => *gross,
            UnitPrice::Net { net, gross } => *gross.get_or_init(|| {
                let derived = calc.unit_gross_from_net(self.rate, *net);
                self.original_gross.get_or_init(|| derived);
                derived
            }),
        }
    }

    /// Unit price excluding VAT, derived from gross on first read.
    pub fn unit_net<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> Decimal {
        match &self.price {
            UnitPrice::Net { net, .. } => *net,
            UnitPrice::Gross { gross, net } => *net.get_or_init(|| {
                let derived = calc.unit_net_from_gross(self.rate, *gross);
                self.original_net.get_or_init(|| derived);
                derived
            }),
        }
    }

    /// Unit gross before any discount, if it has been entered or derived.
    pub fn original_gross(&self) -> Option<Decimal> {
        self.original_gross.get().copied()
    }

    /// Unit net before any discount, if it has been entered or derived.
    pub fn original_net(&self) -> Option<Decimal> {
        self.original_net.get().copied()
    }

    /// Whether a discount has changed this line's price.
    pub fn is_discounted(&self) -> bool {
        self.discounted
    }

    /// Both unit prices, deriving the missing one.
    pub fn figures<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> LineFigures {
        LineFigures {
            rate: self.rate,
            quantity: self.quantity,
            unit_gross: self.unit_gross(calc),
            unit_net: self.unit_net(calc),
        }
    }

    pub fn total_gross<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> Decimal {
        calc.line_total_gross(&self.figures(calc))
    }

    pub fn total_net<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> Decimal {
        calc.line_total_net(&self.figures(calc))
    }

    pub fn line_vat<S: CalculationStrategy + ?Sized>(&self, calc: &S) -> Decimal {
        calc.line_vat(&self.figures(calc))
    }

    /// Subtract `amount` from the unit price on the chosen side.
    ///
    /// The other side is dropped and re-derived from the discounted price on
    /// the next read. The original snapshots are filled before the change
    /// and never touched afterwards.
    pub fn apply_discount<S: CalculationStrategy + ?Sized>(
        &mut self,
        calc: &S,
        amount: Decimal,
        on_gross: bool,
    ) {
        let LineFigures {
            unit_gross,
            unit_net,
            ..
        } = self.figures(calc);

        self.price = if on_gross {
            UnitPrice::Gross {
                gross: unit_gross - amount,
                net: OnceCell::new(),
            }
        } else {
            UnitPrice::Net {
                net: unit_net - amount,
                gross: OnceCell::new(),
            }
        };
        self.discounted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calc::StandardCalculation;
    use rust_decimal_macros::dec;

    #[test]
    fn gross_line_derives_net_once() {
        let calc = StandardCalculation::default();
        let item = LineItem::from_gross(&calc, dec!(21), dec!(121), dec!(1)).unwrap();
        assert_eq!(item.original_net(), None);
        assert_eq!(item.unit_net(&calc), dec!(99.99));
        assert_eq!(item.original_net(), Some(dec!(99.99)));
        assert_eq!(item.unit_net(&calc), dec!(99.99));
        assert_eq!(item.total_gross(&calc), dec!(121));
        assert_eq!(item.total_net(&calc), dec!(99.99));
        assert_eq!(item.line_vat(&calc), dec!(21.01));
    }

    #[test]
    fn net_line_derives_gross() {
        let calc = StandardCalculation::default();
        let item = LineItem::from_net(&calc, dec!(15), dec!(100), dec!(3)).unwrap();
        assert_eq!(item.unit_gross(&calc), dec!(115));
        assert_eq!(item.original_gross(), Some(dec!(115)));
        assert_eq!(item.total_net(&calc), dec!(300));
        assert_eq!(item.total_gross(&calc), dec!(345));
    }

    #[test]
    fn both_prices_are_kept_verbatim() {
        let calc = StandardCalculation::default();
        let item =
            LineItem::new(&calc, dec!(21), Some(dec!(121)), Some(dec!(100)), dec!(1)).unwrap();
        assert_eq!(item.unit_net(&calc), dec!(100));
        assert_eq!(item.original_net(), Some(dec!(100)));
    }

    #[test]
    fn construction_errors() {
        let calc = StandardCalculation::default();
        assert_eq!(
            LineItem::new(&calc, dec!(21), None, None, dec!(1)).unwrap_err(),
            TaxError::MissingPrice
        );
        assert_eq!(
            LineItem::from_gross(&calc, dec!(19), dec!(119), dec!(1)).unwrap_err(),
            TaxError::InvalidRate(dec!(19))
        );
        assert_eq!(
            LineItem::from_net(&calc, dec!(21), dec!(10), dec!(0)).unwrap_err(),
            TaxError::InvalidQuantity(dec!(0))
        );
    }

    #[test]
    fn discount_on_gross_rederives_net() {
        let calc = StandardCalculation::default();
        let mut item = LineItem::from_gross(&calc, dec!(21), dec!(121), dec!(1)).unwrap();
        item.apply_discount(&calc, dec!(3.22), true);

        assert!(item.is_discounted());
        assert_eq!(item.unit_gross(&calc), dec!(117.78));
        // 117.78 × 0.1736 = 20.446608 → 20.45
        assert_eq!(item.unit_net(&calc), dec!(97.33));
        assert_eq!(item.original_gross(), Some(dec!(121)));
        assert_eq!(item.original_net(), Some(dec!(99.99)));
    }

    #[test]
    fn discount_on_net_keeps_gross_snapshot() {
        let calc = StandardCalculation::default();
        let mut item = LineItem::from_net(&calc, dec!(10), dec!(50), dec!(2)).unwrap();
        item.apply_discount(&calc, dec!(5), false);

        assert_eq!(item.unit_net(&calc), dec!(45));
        assert_eq!(item.unit_gross(&calc), dec!(49.5));
        assert_eq!(item.original_net(), Some(dec!(50)));
        assert_eq!(item.original_gross(), Some(dec!(55)));
    }
}

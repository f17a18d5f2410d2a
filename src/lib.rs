//! # vat-ledger
//!
//! VAT calculation for lists of priced line items: gross/net derivation,
//! totals grouped by VAT rate, cash rounding, and a lump discount spread
//! over all lines in proportion to their totals.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Rounding is commercial (half away from zero).
//!
//! ## Quick Start
//!
//! ```rust
//! use vat_ledger::core::*;
//! use rust_decimal_macros::dec;
//!
//! let mut ledger = PriceLedger::new(HIGH_PERCENT);
//! ledger.add_with_gross(dec!(121), dec!(1)).unwrap();
//! ledger.add(NewLine::gross(dec!(299)).quantity(dec!(4)).rate(LOW_PERCENT)).unwrap();
//!
//! assert_eq!(ledger.total_gross(), dec!(1317.00));
//! assert_eq!(ledger.rounding(0), dec!(0));
//!
//! ledger.apply_discount(dec!(100), true).unwrap();
//! assert_eq!(ledger.total_gross_before_discount(), dec!(1317.00));
//! assert!(ledger.total_gross() < dec!(1317.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `recap` (default) | Plain-text recap of a ledger's lines and totals |

pub mod core;

#[cfg(feature = "recap")]
pub mod recap;

// Re-export core types at crate root for convenience
pub use crate::core::*;

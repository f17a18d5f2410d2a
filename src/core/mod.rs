//! Price arithmetic, line items and the price ledger.
//!
//! This module holds the calculation engine: gross/net derivation per line,
//! per-rate aggregation, and proportional discount distribution.

mod calc;
mod discount;
mod error;
mod item;
mod ledger;
mod rates;
mod totals;

pub use calc::*;
pub use discount::*;
pub use error::*;
pub use item::*;
pub use ledger::*;
pub use rates::*;
pub use totals::*;

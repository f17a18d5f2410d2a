use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by line construction, rate configuration and discounting.
///
/// Every variant is a precondition failure detected before any state is
/// mutated, so a failed call leaves the ledger exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TaxError {
    /// The VAT rate is not one of the configured percentages.
    #[error("{0} is not an allowed VAT rate")]
    InvalidRate(Decimal),

    /// Neither a gross nor a net unit price was supplied.
    #[error("at least one unit price (gross or net) is required")]
    MissingPrice,

    /// Quantity must be strictly positive.
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Discount amounts cannot be negative.
    #[error("discount cannot be negative, got {0}")]
    NegativeDiscount(Decimal),

    /// The requested discount is larger than the total it is taken from.
    #[error("discount {amount} cannot be higher than total price {total}")]
    DiscountExceedsTotal { amount: Decimal, total: Decimal },

    /// Rate table configuration is unusable.
    #[error("invalid rate table: {0}")]
    InvalidRateTable(String),

    /// No index is left after the highest occupied slot.
    #[error("no free line index after {0}")]
    IndexExhausted(usize),
}

use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;
use vat_ledger::core::*;
use vat_ledger::recap::Recap;

fn main() {
    // RUST_LOG=vat_ledger=debug shows how the discount is split
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut ledger = PriceLedger::new(HIGH_PERCENT);

    ledger.add_with_gross(dec!(121), dec!(1)).unwrap();
    ledger.add_with_gross(dec!(146.7), dec!(2.5)).unwrap();

    ledger
        .add(NewLine::gross(dec!(200)).quantity(dec!(2)).rate(MEDIUM_PERCENT))
        .unwrap();
    ledger
        .add(NewLine::gross(dec!(223.3)).quantity(dec!(3)).rate(MEDIUM_PERCENT))
        .unwrap();

    ledger
        .add(NewLine::gross(dec!(299)).quantity(dec!(4)).rate(LOW_PERCENT))
        .unwrap();
    ledger
        .add(NewLine::gross(dec!(305.2)).quantity(dec!(4.5)).rate(LOW_PERCENT))
        .unwrap();

    println!("{}", Recap::new(&ledger));

    ledger
        .apply_discount(dec!(100), true)
        .expect("discount is below the total");
    println!("--- after discount of 100 ---");
    println!("{}", Recap::new(&ledger));
}

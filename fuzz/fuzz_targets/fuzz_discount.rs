#![no_main]

use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;
use vat_ledger::{HIGH_PERCENT, LOW_PERCENT, MEDIUM_PERCENT, NewLine, PriceLedger};

fuzz_target!(|data: &[u8]| {
    // Each 4-byte chunk is one line: price in cents, quantity, rate and side.
    // The leftover bytes pick the discount.
    let mut ledger = PriceLedger::new(HIGH_PERCENT);
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let cents = i64::from(u16::from_le_bytes([chunk[0], chunk[1]]));
        let quantity = Decimal::from(chunk[2] % 20);
        let rate = [LOW_PERCENT, MEDIUM_PERCENT, HIGH_PERCENT][usize::from(chunk[3] % 3)];
        let line = if chunk[3] & 0x80 == 0 {
            NewLine::gross(Decimal::new(cents, 2))
        } else {
            NewLine::net(Decimal::new(cents, 2))
        };
        // Zero quantities are rejected, which must not panic either.
        let _ = ledger.add(line.quantity(quantity).rate(rate));
    }

    let rest = chunks.remainder();
    let on_gross = rest.first().is_none_or(|b| b & 1 == 0);
    let amount = Decimal::new(
        i64::from(rest.iter().fold(0u32, |acc, b| acc * 256 + u32::from(*b))),
        2,
    );

    let gross = ledger.total_gross();
    let net = ledger.total_net();
    match ledger.apply_discount(amount, on_gross) {
        Ok(alloc) => assert_eq!(alloc.by_rate.total(), amount),
        Err(_) => {
            assert_eq!(ledger.total_gross(), gross);
            assert_eq!(ledger.total_net(), net);
        }
    }
    let _ = ledger.summary();
});

//! Property 5: the fixed-point decimal codec round-trips canonically.

use proptest::prelude::*;

use tradecore_rs::types::FixedPoint;

type Fp = FixedPoint<1_000_000>;

proptest! {
    /// `format(parse(s))` equals the canonicalised input for any value
    /// representable in the scale.
    #[test]
    fn format_parse_round_trip(raw in -9_000_000_000_000i64..9_000_000_000_000i64) {
        let value = Fp::from_raw(raw);
        let text = value.to_string();
        let reparsed = Fp::parse(&text).expect("canonical text parses");
        prop_assert_eq!(reparsed.raw(), raw);
        // Canonical text is a fixed point: formatting again is stable.
        prop_assert_eq!(reparsed.to_string(), text);
    }

    /// Parsing is insensitive to trailing fractional zeros.
    #[test]
    fn trailing_zeros_are_canonicalised(units in -9_000i64..9_000i64, frac in 0i64..1_000_000i64) {
        let padded = format!("{units}.{frac:06}");
        let trimmed = Fp::parse(&padded).expect("padded decimal parses");
        prop_assert_eq!(Fp::parse(&trimmed.to_string()), Some(trimmed));
    }

    /// Saturating arithmetic never wraps.
    #[test]
    fn addition_saturates(a in any::<i64>(), b in any::<i64>()) {
        let sum = Fp::from_raw(a).saturating_add(Fp::from_raw(b));
        prop_assert_eq!(sum.raw(), a.saturating_add(b));
    }
}

#[test]
fn negative_fraction_round_trip() {
    let v = Fp::parse("-0.000001").unwrap();
    assert_eq!(v.raw(), -1);
    assert_eq!(v.to_string(), "-0.000001");
}

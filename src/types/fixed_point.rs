//! Scaled 64-bit fixed-point values for prices and quantities.
//!
//! Prices and quantities are never represented as floats inside the
//! engine. A [`FixedPoint<SCALE>`] wraps a single `i64` holding
//! `value * SCALE`; multiplication and division widen through `i128` so a
//! full-range product cannot overflow. `i64::MAX` is reserved as the
//! "no value" sentinel: arithmetic on an invalid value is a caller bug
//! and is not checked on the hot path.

use std::fmt;

const DECIMAL_BASE: i64 = 10;

/// A fixed-point decimal with a compile-time scale.
///
/// `SCALE` must be a positive power of ten. The wrapper is exactly eight
/// bytes and `Copy`; it never allocates.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedPoint<const SCALE: i64> {
    raw: i64,
}

impl<const SCALE: i64> FixedPoint<SCALE> {
    /// Sentinel raw value meaning "no value".
    pub const INVALID_RAW: i64 = i64::MAX;

    /// The "no value" sentinel.
    pub const INVALID: Self = Self {
        raw: Self::INVALID_RAW,
    };

    /// Zero in this scale.
    pub const ZERO: Self = Self { raw: 0 };

    /// Wrap an already-scaled raw value.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self { raw }
    }

    /// Scale up a human-readable integer (`100` becomes `100 * SCALE`).
    #[inline]
    pub const fn from_int(val: i64) -> Self {
        Self { raw: val * SCALE }
    }

    /// Convert from a float, rounding half away from zero. Test helper;
    /// the hot paths parse decimal strings instead.
    #[inline]
    pub fn from_f64(val: f64) -> Self {
        let offset = if val >= 0.0 { 0.5 } else { -0.5 };
        Self {
            raw: (val * SCALE as f64 + offset) as i64,
        }
    }

    /// Parse a plain decimal string (`-123.45`). Fractional digits beyond
    /// the scale are truncated toward zero; anything other than digits,
    /// one `-` and one `.` yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return None;
        }

        let mut integer_part: i64 = 0;
        let mut frac_part: i64 = 0;
        let mut frac_scale: i64 = 1;
        let mut in_frac = false;
        let mut negative = false;
        let mut digits = 0usize;

        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'-' if i == 0 => negative = true,
                b'.' if !in_frac => in_frac = true,
                b'0'..=b'9' => {
                    let digit = i64::from(b - b'0');
                    if in_frac {
                        if frac_scale < SCALE {
                            frac_part = frac_part * DECIMAL_BASE + digit;
                            frac_scale *= DECIMAL_BASE;
                        }
                    } else {
                        integer_part = integer_part.checked_mul(DECIMAL_BASE)?.checked_add(digit)?;
                    }
                    digits += 1;
                }
                _ => return None,
            }
        }
        if digits == 0 {
            return None;
        }

        let raw = integer_part.checked_mul(SCALE)? + frac_part * (SCALE / frac_scale);
        Some(Self {
            raw: if negative { -raw } else { raw },
        })
    }

    /// The underlying scaled integer.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.raw
    }

    /// The compile-time scale.
    #[inline]
    pub const fn scale() -> i64 {
        SCALE
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.raw != Self::INVALID_RAW
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.raw == 0
    }

    /// Saturating addition on the raw representation.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            raw: self.raw.saturating_add(other.raw),
        }
    }

    /// Saturating subtraction on the raw representation.
    #[inline]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self {
            raw: self.raw.saturating_sub(other.raw),
        }
    }

    /// Full-precision multiply: widens to `i128`, rescales back.
    #[inline]
    pub const fn mul(self, other: Self) -> Self {
        let wide = self.raw as i128 * other.raw as i128;
        Self {
            raw: (wide / SCALE as i128) as i64,
        }
    }

    /// Full-precision divide: widens to `i128` before scaling.
    #[inline]
    pub const fn div(self, other: Self) -> Self {
        let wide = self.raw as i128 * SCALE as i128;
        Self {
            raw: (wide / other.raw as i128) as i64,
        }
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.raw as f64 / SCALE as f64
    }

    /// Truncate toward zero onto a coarser grid: the result's raw value
    /// is a multiple of `step_ratio` (the internal-to-exchange scale
    /// ratio). Used when formatting outbound decimals so orders never
    /// carry more precision than the exchange accepts.
    #[inline]
    pub const fn truncate_to_step(self, step_ratio: i64) -> Self {
        if step_ratio <= 1 {
            return self;
        }
        Self {
            raw: (self.raw / step_ratio) * step_ratio,
        }
    }

    /// Float value truncated toward zero to the given decimal precision.
    /// Used when the exchange-visible precision is coarser than the
    /// internal scale.
    pub fn to_f64_truncated(self, precision: u32) -> f64 {
        let mut divisor: i64 = 1;
        let mut s = SCALE;
        let mut scale_digits = 0u32;
        while s > 1 {
            s /= DECIMAL_BASE;
            scale_digits += 1;
        }
        let mut i = precision;
        while i < scale_digits {
            divisor *= DECIMAL_BASE;
            i += 1;
        }
        let truncated = (self.raw / divisor) * divisor;
        truncated as f64 / SCALE as f64
    }

    /// Canonical decimal rendering with trailing zeros trimmed, written
    /// into `out`. `format(parse(s))` reproduces the canonicalised input.
    fn write_decimal(self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut val = self.raw;
        if val < 0 {
            out.write_str("-")?;
            val = -val;
        }

        let integer_part = val / SCALE;
        let mut frac_part = val % SCALE;

        let mut frac_digits = 0u32;
        let mut s = SCALE;
        while s > 1 {
            s /= DECIMAL_BASE;
            frac_digits += 1;
        }
        while frac_digits > 0 && frac_part % DECIMAL_BASE == 0 {
            frac_part /= DECIMAL_BASE;
            frac_digits -= 1;
        }

        if frac_digits > 0 {
            write!(out, "{integer_part}.{frac_part:0width$}", width = frac_digits as usize)
        } else {
            write!(out, "{integer_part}")
        }
    }
}

impl<const SCALE: i64> fmt::Display for FixedPoint<SCALE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("INVALID");
        }
        self.write_decimal(f)
    }
}

impl<const SCALE: i64> fmt::Debug for FixedPoint<SCALE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint<{SCALE}>({self})")
    }
}

impl<const SCALE: i64> Default for FixedPoint<SCALE> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<const SCALE: i64> std::ops::Add for FixedPoint<SCALE> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl<const SCALE: i64> std::ops::Sub for FixedPoint<SCALE> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl<const SCALE: i64> std::ops::AddAssign for FixedPoint<SCALE> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.raw = self.raw.saturating_add(rhs.raw);
    }
}

impl<const SCALE: i64> std::ops::SubAssign for FixedPoint<SCALE> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.raw = self.raw.saturating_sub(rhs.raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Fp100 = FixedPoint<100>;
    type Fp1m = FixedPoint<1_000_000>;

    #[test]
    fn parse_integer_and_fraction() {
        assert_eq!(Fp100::parse("100").unwrap().raw(), 10_000);
        assert_eq!(Fp100::parse("100.05").unwrap().raw(), 10_005);
        assert_eq!(Fp100::parse("-3.5").unwrap().raw(), -350);
        assert_eq!(Fp100::parse("0.5").unwrap().raw(), 50);
    }

    #[test]
    fn parse_truncates_excess_fraction() {
        // Scale carries two digits; the third is dropped.
        assert_eq!(Fp100::parse("1.239").unwrap().raw(), 123);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Fp100::parse("").is_none());
        assert!(Fp100::parse("abc").is_none());
        assert!(Fp100::parse("1,5").is_none());
        assert!(Fp100::parse("-").is_none());
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Fp1m::parse("12.500000").unwrap().to_string(), "12.5");
        assert_eq!(Fp1m::parse("12.000000").unwrap().to_string(), "12");
        assert_eq!(Fp1m::parse("0.000001").unwrap().to_string(), "0.000001");
        assert_eq!(Fp100::from_raw(-350).to_string(), "-3.5");
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!Fp100::INVALID.is_valid());
        assert_eq!(Fp100::INVALID.to_string(), "INVALID");
        assert!(Fp100::ZERO.is_valid());
    }

    #[test]
    fn mul_div_widen_through_i128() {
        let a = Fp1m::from_int(3_000_000);
        let b = Fp1m::from_int(2);
        assert_eq!(a.mul(b).raw(), Fp1m::from_int(6_000_000).raw());
        assert_eq!(a.div(b).raw(), Fp1m::from_int(1_500_000).raw());
    }

    #[test]
    fn saturating_bounds() {
        let near_max = Fp100::from_raw(i64::MAX - 1);
        assert_eq!(near_max.saturating_add(Fp100::from_raw(10)).raw(), i64::MAX);
        let near_min = Fp100::from_raw(i64::MIN + 1);
        assert_eq!(near_min.saturating_sub(Fp100::from_raw(10)).raw(), i64::MIN);
    }

    #[test]
    fn truncated_float_matches_coarser_precision() {
        // 98234.1267 truncated to 2 decimals at scale 10^6.
        let v = Fp1m::parse("98234.126700").unwrap();
        assert_eq!(v.to_f64_truncated(2), 98234.12);
    }
}

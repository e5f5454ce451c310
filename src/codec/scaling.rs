//! Exact physical-to-raw conversion for integer fields.
//!
//! `(value - offset) / factor` evaluated in binary floating point is a
//! classic off-by-one source with DBC factors like 0.1: the quotient
//! lands a hair below the true value and truncation drops a count. The
//! conversion here decomposes each f64 into an exact integer-times-
//! power-of-two rational, evaluates the quotient rationally over i128
//! and rounds half-to-even.

/// Exact rational form of a finite f64: `value = numerator * 2^exponent`.
fn decompose(value: f64) -> (i128, i32) {
    let bits = value.to_bits();
    let sign: i128 = if bits >> 63 == 1 { -1 } else { 1 };
    let exponent = ((bits >> 52) & 0x7FF) as i32;
    let fraction = (bits & ((1u64 << 52) - 1)) as i128;

    let (mut numerator, mut exponent) = if exponent == 0 {
        (sign * fraction, -1074)
    } else {
        (sign * (fraction | (1 << 52)), exponent - 1075)
    };

    // Normalize so shifts stay small for ordinary factors.
    if numerator != 0 {
        let zeros = numerator.trailing_zeros().min(1073) as i32;
        numerator >>= zeros;
        exponent += zeros;
    } else {
        exponent = 0;
    }

    (numerator, exponent)
}

fn shifted(value: i128, shift: i32) -> Option<i128> {
    if shift == 0 || value == 0 {
        return Some(value);
    }
    if !(0..=126).contains(&shift) {
        return None;
    }
    // checked_shl only validates the shift amount, not bit loss.
    let used = 128 - value.unsigned_abs().leading_zeros();
    if used + shift as u32 > 126 {
        return None;
    }
    Some(value << shift)
}

/// Rounds `p / q` (`q > 0`) to the nearest integer, ties to even.
fn round_half_even(p: i128, q: i128) -> i128 {
    let div = p.div_euclid(q);
    let rem = p.rem_euclid(q);
    match (2 * rem).cmp(&q) {
        std::cmp::Ordering::Less => div,
        std::cmp::Ordering::Greater => div + 1,
        std::cmp::Ordering::Equal => {
            if div % 2 == 0 {
                div
            } else {
                div + 1
            }
        }
    }
}

fn to_raw_exact(value: (i128, i32), offset: f64, factor: f64) -> Option<i64> {
    if factor == 0.0 || !offset.is_finite() || !factor.is_finite() {
        return None;
    }

    let (value_n, value_e) = value;
    let (offset_n, offset_e) = decompose(offset);
    let (factor_n, factor_e) = decompose(factor);

    // value - offset, aligned to the smaller exponent.
    let diff_e = value_e.min(offset_e);
    let diff_n = shifted(value_n, value_e - diff_e)?
        .checked_sub(shifted(offset_n, offset_e - diff_e)?)?;

    // (diff_n * 2^diff_e) / (factor_n * 2^factor_e)
    let scale_e = diff_e - factor_e;
    let (mut p, mut q) = if scale_e >= 0 {
        (shifted(diff_n, scale_e)?, factor_n)
    } else {
        (diff_n, shifted(factor_n, -scale_e)?)
    };
    if q < 0 {
        p = -p;
        q = -q;
    }

    i64::try_from(round_half_even(p, q)).ok()
}

/// Converts a physical integer value to the raw field value.
pub(crate) fn int_to_raw(value: i64, offset: f64, factor: f64) -> i64 {
    to_raw_exact((value as i128, 0), offset, factor)
        .unwrap_or_else(|| ((value as f64 - offset) / factor).round_ties_even() as i64)
}

/// Converts a physical float value to the raw field value.
pub(crate) fn float_to_raw(value: f64, offset: f64, factor: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    to_raw_exact(decompose(value), offset, factor)
        .unwrap_or_else(|| ((value - offset) / factor).round_ties_even() as i64)
}

/// `true` when an f64 represents an integer exactly, so scaled decode
/// results can stay integral.
pub(crate) fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < (1u64 << 63) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_scaling() {
        assert_eq!(int_to_raw(200, 0.0, 1.0), 200);
        assert_eq!(int_to_raw(100, -40.0, 1.0), 140);
        assert_eq!(int_to_raw(-30, 0.0, 2.0), -15);
    }

    #[test]
    fn test_decimal_factor_has_no_drift() {
        // 25.1 / 0.1 in f64 is 250.99999999999997 and truncation-based
        // conversions land on 250.
        assert_eq!(float_to_raw(25.1, 0.0, 0.1), 251);
        assert_eq!(float_to_raw(0.3, 0.0, 0.1), 3);
        assert_eq!(float_to_raw(229.5, 0.0, 0.004), 57375);
        assert_eq!(float_to_raw(-1.7, 0.1, 0.01), -180);
    }

    #[test]
    fn test_half_even_rounding() {
        assert_eq!(int_to_raw(3, 0.0, 2.0), 2); // 1.5 -> 2
        assert_eq!(int_to_raw(5, 0.0, 2.0), 2); // 2.5 -> 2
        assert_eq!(int_to_raw(7, 0.0, 2.0), 4); // 3.5 -> 4
        assert_eq!(int_to_raw(-3, 0.0, 2.0), -2); // -1.5 -> -2
    }

    #[test]
    fn test_extreme_inputs_fall_back() {
        // Exponents too far apart for the rational path still produce
        // a sane result through the float fallback.
        assert_eq!(float_to_raw(1e30, 0.0, 1e-30), i64::MAX);
        assert_eq!(int_to_raw(0, 0.0, 1e300), 0);
    }

    #[test]
    fn test_is_integral() {
        assert!(is_integral(1.0));
        assert!(is_integral(-3.0));
        assert!(!is_integral(0.1));
        assert!(!is_integral(f64::NAN));
    }
}

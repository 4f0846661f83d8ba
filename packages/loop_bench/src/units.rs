//! Binary-prefixed rendering of numbers, used in instance names and plain-text reports.

use std::fmt::Write;

// Kibi, Mebi, Gibi, Tebi, Pebi, Exbi, Zebi, Yobi.
const BIG_PREFIXES: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

// milli, micro, nano, pico, femto, atto, zepto, yocto.
const SMALL_PREFIXES: [char; 8] = ['m', 'u', 'n', 'p', 'f', 'a', 'z', 'y'];

const ONE_K: f64 = 1024.0;

/// Maximum number of significant digits in a rendered mantissa.
const SIGNIFICANT_DIGITS: i32 = 6;

/// Renders a benchmark argument the way it appears in an instance name.
///
/// Values up to and including 1024 are printed as they are; larger ones are scaled down by powers
/// of 1024 and get an IEC prefix, so 8192 becomes `8Ki` and 1 048 576 becomes `1Mi`.
pub(crate) fn argument_suffix(value: i64) -> String {
    #[expect(
        clippy::cast_precision_loss,
        reason = "arguments above 2^53 lose precision in the name only, which is acceptable"
    )]
    let value = value as f64;

    to_binary_string(value, 1.0, 0)
}

/// Renders a rate or byte count for human consumption, e.g. `1.5Ki` or `37.3Mi`.
///
/// Values up to 1.1 of the next unit are kept in the smaller unit to soften edge effects.
pub(crate) fn human_readable(value: f64) -> String {
    to_binary_string(value, 1.1, 1)
}

fn to_binary_string(value: f64, threshold: f64, precision: i32) -> String {
    let mut out = String::new();

    let mut value = value;
    if value < 0.0 {
        out.push('-');
        value = -value;
    }

    // Never exclude values that cannot be rendered in `precision` digits.
    let threshold = threshold.max(10.0_f64.powi(-precision));
    let big_threshold = threshold * ONE_K;

    if value > big_threshold {
        let mut scaled = value;
        for prefix in BIG_PREFIXES {
            scaled /= ONE_K;
            if scaled <= big_threshold {
                push_mantissa(&mut out, scaled);
                out.push(prefix);
                out.push('i');
                return out;
            }
        }
    } else if value < threshold && value > 0.0 {
        let mut scaled = value;
        for prefix in SMALL_PREFIXES {
            scaled *= ONE_K;
            if scaled >= threshold {
                push_mantissa(&mut out, scaled);
                out.push(prefix);
                return out;
            }
        }
    }

    push_mantissa(&mut out, value);
    out
}

/// Appends `value` with at most [`SIGNIFICANT_DIGITS`] significant digits and no trailing zeros.
fn push_mantissa(out: &mut String, value: f64) {
    if value.fract() == 0.0 && value < 1e15 {
        write!(out, "{value:.0}").expect("writing to a String cannot fail");
        return;
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "log10 of any finite f64 fits comfortably in i32"
    )]
    let integer_digits = if value >= 1.0 {
        (value.log10().floor() as i32).saturating_add(1)
    } else {
        1
    };

    let decimals = usize::try_from(SIGNIFICANT_DIGITS.saturating_sub(integer_digits).max(0))
        .expect("guarded by max(0) above");

    let formatted = format!("{value:.decimals$}");
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };

    out.push_str(trimmed);
}

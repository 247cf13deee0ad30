//! Fixed-point temperature parsing.
//!
//! Temperatures are carried as integers scaled by ten (`-12.3` is `-123`),
//! so no floating-point parsing or summation happens anywhere in the scan.

use snafu::Snafu;

/// Which contract the parser enforces.
///
/// The mode is chosen once per run and shared by every worker; the two
/// contracts are never mixed within one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Accept exactly `-?\d{1,2}\.\d` and reject everything else.
    #[default]
    Strict,
    /// Skip `-` and `.`, accumulate every other byte as a digit. The result
    /// for malformed input is unspecified, but parsing never panics.
    Trusted,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ValueError {
    #[snafu(display("empty temperature"))]
    Empty,

    #[snafu(display("unexpected byte {byte:#04x} at position {position}"))]
    UnexpectedByte { byte: u8, position: usize },

    #[snafu(display("expected one or two integer digits, found {count}"))]
    IntegerDigits { count: usize },

    #[snafu(display("missing decimal point"))]
    MissingPoint,

    #[snafu(display("expected exactly one fractional digit, found {count}"))]
    FractionDigits { count: usize },
}

/// Parses a complete value span into tenths.
pub fn parse_scaled(span: &[u8], mode: ParseMode) -> Result<i32, ValueError> {
    let (value, used) = parse_prefix(span, mode)?;
    if used != span.len() {
        return Err(ValueError::UnexpectedByte {
            byte: span[used],
            position: used,
        });
    }
    Ok(value)
}

/// Parses a value that starts at `bytes[0]` and runs up to the first `\n` (or
/// the end of `bytes`). Returns the scaled value and the number of bytes the
/// value occupied, not counting the terminator.
///
/// This is the form the scanner uses: value parsing and terminator search are
/// one pass over the bytes.
#[inline]
pub fn parse_prefix(bytes: &[u8], mode: ParseMode) -> Result<(i32, usize), ValueError> {
    match mode {
        ParseMode::Strict => parse_strict(bytes),
        ParseMode::Trusted => Ok(parse_trusted(bytes)),
    }
}

#[inline]
fn parse_trusted(bytes: &[u8]) -> (i32, usize) {
    let mut negative = false;
    let mut value: i32 = 0;
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\n' => break,
            b'-' => negative = true,
            b'.' => {}
            _ => value = value.wrapping_mul(10).wrapping_add(b.wrapping_sub(b'0') as i32),
        }
        i += 1;
    }
    (if negative { value.wrapping_neg() } else { value }, i)
}

#[inline]
fn is_end(b: Option<&u8>) -> bool {
    matches!(b, None | Some(b'\n'))
}

fn parse_strict(bytes: &[u8]) -> Result<(i32, usize), ValueError> {
    if is_end(bytes.first()) {
        return Err(ValueError::Empty);
    }

    let negative = bytes[0] == b'-';
    let mut i = usize::from(negative);
    let mut value: i32 = 0;

    let int_start = i;
    while let Some(&(b @ b'0'..=b'9')) = bytes.get(i) {
        // Saturating: runs longer than two digits are rejected below.
        value = value.saturating_mul(10).saturating_add((b - b'0') as i32);
        i += 1;
    }
    let int_digits = i - int_start;

    match bytes.get(i) {
        Some(b'.') => {}
        Some(&byte) if byte != b'\n' => {
            return Err(ValueError::UnexpectedByte { byte, position: i });
        }
        _ if int_digits == 0 => return Err(ValueError::IntegerDigits { count: 0 }),
        _ => return Err(ValueError::MissingPoint),
    }
    if !(1..=2).contains(&int_digits) {
        return Err(ValueError::IntegerDigits { count: int_digits });
    }
    i += 1;

    let frac_start = i;
    while let Some(&(b @ b'0'..=b'9')) = bytes.get(i) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i32);
        i += 1;
    }
    if let Some(&byte) = bytes.get(i).filter(|b| **b != b'\n') {
        return Err(ValueError::UnexpectedByte { byte, position: i });
    }
    let frac_digits = i - frac_start;
    if frac_digits != 1 {
        return Err(ValueError::FractionDigits { count: frac_digits });
    }

    Ok((if negative { -value } else { value }, i))
}

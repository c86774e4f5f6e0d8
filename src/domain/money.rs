use std::fmt;

/// Amounts are stored as signed integer cents so balances add up exactly.
/// Positive amounts credit the wallet, negative amounts debit it.
pub type Cents = i64;

/// Format cents as a two-decimal string.
/// Example: 12000 -> "120.00", -3050 -> "-30.50"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "-30" -> -3000
///
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if digits.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let (units_str, decimal_str) = digits.split_once('.').unwrap_or((digits, ""));
    if decimal_str.contains('.') || (units_str.is_empty() && decimal_str.is_empty()) {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        parse_digits(units_str)?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => parse_digits(decimal_str)? * 10,
        _ => parse_digits(&decimal_str[..2])?,
    };
    if decimal_str.len() > 2 {
        // Truncated digits still have to be digits
        parse_digits(&decimal_str[2..])?;
    }

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

fn parse_digits(s: &str) -> Result<i64, ParseCentsError> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    s.parse().map_err(|_| ParseCentsError::OutOfRange)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

use std::fmt;

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 Rs = 100 cents, so a 1.50 Rs spin prize is 150 cents.
pub type Cents = i64;

/// Currency label used when rendering amounts for people.
pub const CURRENCY: &str = "Rs";

/// Convert whole currency units into cents.
pub const fn units(amount: i64) -> Cents {
    amount * 100
}

/// Format cents as a plain decimal string.
/// Example: 11500 -> "115.00", -5000 -> "-50.00"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Format cents with the currency label, e.g. "15.00 Rs".
pub fn format_amount(cents: Cents) -> String {
    format!("{} {}", format_cents(cents), CURRENCY)
}

/// Parse a decimal string such as "15", "1.5" or "-50.00" into cents.
/// Digits beyond the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if fraction.contains('.') {
        return Err(ParseCentsError::InvalidFormat);
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        parse_digits(whole)?
    };

    let fraction: String = fraction.chars().chain("00".chars()).take(2).collect();
    let fraction = parse_digits(&fraction)?;

    let cents = whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

fn parse_digits(s: &str) -> Result<i64, ParseCentsError> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    s.parse().map_err(|_| ParseCentsError::Overflow)
}

/// Parse the decimal string cached under a `balance_<username>` key.
pub fn parse_stored_balance(input: &str) -> Option<Cents> {
    parse_cents(input).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    Empty,
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::Empty => write!(f, "empty amount"),
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

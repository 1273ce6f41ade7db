//! Locale-aware amount codec.
//!
//! Argentine statements print `2.246.170,50` (`.` groups thousands, `,` marks
//! the fraction). HSBC prints `9,813,718.17`. Negative values show up as a
//! leading `-`, a `-$` prefix, a trailing `-` (`99.918,00-`) or the word
//! `menos` (`menos $ 1.500,00`).

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AmountFormatError;

/// Which characters separate thousands and the fraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStyle {
    /// `1.234,56`
    #[default]
    Argentine,
    /// `1,234.56`
    UsLedger,
}

impl NumberStyle {
    /// (thousands separator, decimal separator)
    pub fn separators(self) -> (char, char) {
        match self {
            NumberStyle::Argentine => ('.', ','),
            NumberStyle::UsLedger => (',', '.'),
        }
    }
}

/// Where `format_amount_with` puts the minus sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignPlacement {
    #[default]
    Leading,
    Trailing,
}

/// Parse an Argentine-formatted amount.
pub fn parse_amount(text: &str) -> Result<Decimal, AmountFormatError> {
    parse_amount_with(text, NumberStyle::Argentine)
}

/// Parse an amount, returning `None` for blank text.
///
/// A blank column means "absent", which is not the same as a printed zero.
pub fn parse_optional_amount(text: &str) -> Result<Option<Decimal>, AmountFormatError> {
    parse_optional_amount_with(text, NumberStyle::Argentine)
}

pub fn parse_optional_amount_with(
    text: &str,
    style: NumberStyle,
) -> Result<Option<Decimal>, AmountFormatError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_amount_with(text, style).map(Some)
}

pub fn parse_amount_with(text: &str, style: NumberStyle) -> Result<Decimal, AmountFormatError> {
    let err = || AmountFormatError::new(text);

    let mut body = text.trim().to_lowercase();
    let mut signs = 0;
    if body.contains("menos") {
        body = body.replace("menos", "");
        signs += 1;
    }
    body = body.replace("pesos", "");
    body.retain(|c| c != '$' && !c.is_whitespace());

    if let Some(rest) = body.strip_prefix('-') {
        body = rest.to_string();
        signs += 1;
    }
    if let Some(rest) = body.strip_suffix('-') {
        body = rest.to_string();
        signs += 1;
    }
    if signs > 1 {
        return Err(err());
    }

    let (thousands, decimal) = style.separators();
    let (int_part, frac_part) = match body.split_once(decimal) {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body.as_str(), None),
    };

    if !valid_integer_part(int_part, thousands) {
        return Err(err());
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
    }

    let mut normalized: String = int_part.chars().filter(|c| *c != thousands).collect();
    if let Some(frac) = frac_part {
        normalized.push('.');
        normalized.push_str(frac);
    }

    let value = Decimal::from_str(&normalized).map_err(|_| err())?;
    Ok(if signs == 1 { -value } else { value })
}

/// Digits, optionally grouped in threes by the thousands separator.
fn valid_integer_part(int_part: &str, thousands: char) -> bool {
    if int_part.is_empty() {
        return false;
    }
    let groups: Vec<&str> = int_part.split(thousands).collect();
    if groups
        .iter()
        .any(|g| g.is_empty() || !g.chars().all(|c| c.is_ascii_digit()))
    {
        return false;
    }
    groups.len() == 1 || (groups[0].len() <= 3 && groups[1..].iter().all(|g| g.len() == 3))
}

/// Format an amount the Argentine way: `1.234,56`, `-1.234,56`.
pub fn format_amount(value: Decimal) -> String {
    format_amount_with(value, NumberStyle::Argentine, SignPlacement::Leading)
}

pub fn format_amount_with(value: Decimal, style: NumberStyle, sign: SignPlacement) -> String {
    let (thousands, decimal) = style.separators();
    let rounded = value.round_dp(2);
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(c);
    }

    let body = format!("{grouped}{decimal}{frac_part}");
    match (rounded.is_sign_negative() && !rounded.is_zero(), sign) {
        (false, _) => body,
        (true, SignPlacement::Leading) => format!("-{body}"),
        (true, SignPlacement::Trailing) => format!("{body}-"),
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as an integer number of **minor units**
/// (paise).
///
/// Balances may go negative: the hierarchy extends credit downwards and
/// withdrawals are not floored at zero.
///
/// Parsing from operator input accepts `.` or `,` as decimal separator and
/// rejects more than 2 decimals:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
/// assert_eq!(Money::new(-1050).to_string(), "-10.50");
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }
}

/// Render minor units as `major.minor`.
///
/// Takes `i128` so rollups wider than one balance print the same way.
#[must_use]
pub fn format_minor(minor: i128) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minor(i128::from(self.0)))
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.trim().replace(',', ".");
        if rest.is_empty() {
            return Err(empty());
        }

        let (major_str, minor_str) = match rest.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (rest.as_str(), ""),
        };
        if major_str.is_empty()
            || !major_str.chars().all(|c| c.is_ascii_digit())
            || !minor_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| overflow())?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => minor_str.parse().map_err(|_| invalid())?,
            _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
        };

        let total = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;
        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_minor_units() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(7).to_string(), "0.07");
        assert_eq!(Money::new(100_000).to_string(), "1000.00");
        assert_eq!(Money::new(-30_050).to_string(), "-300.50");
    }

    #[test]
    fn format_minor_handles_sums_past_one_balance() {
        let sum = i128::from(i64::MAX) + 1;
        assert_eq!(format_minor(sum), "92233720368547758.08");
        assert_eq!(format_minor(i128::from(i64::MIN)), "-92233720368547758.08");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("1000".parse::<Money>().unwrap().minor(), 100_000);
        assert_eq!("10.5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().minor(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("ten".parse::<Money>().is_err());
    }
}

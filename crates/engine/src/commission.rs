use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Win/loss commission rate, stored as **basis points** (hundredths of a
/// percent) so that `10.5%` is exactly `1050`.
///
/// The engine only stores and validates rates; settling bets against them is
/// the job of downstream consumers.
///
/// ```rust
/// use engine::Commission;
///
/// let rate: Commission = "10.5".parse().unwrap();
/// assert_eq!(rate.bps(), 1050);
/// assert_eq!(rate.to_string(), "10.50%");
/// assert!("100.01".parse::<Commission>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Commission(i32);

impl Commission {
    pub const ZERO: Commission = Commission(0);
    pub const MAX_BPS: i32 = 100_00;

    pub fn try_from_bps(bps: i32) -> ResultEngine<Self> {
        if !(0..=Self::MAX_BPS).contains(&bps) {
            return Err(EngineError::InvalidInput(format!(
                "commission must be between 0 and 100%, got {bps} bps"
            )));
        }
        Ok(Self(bps))
    }

    /// Builds a rate from a percentage, rounding to the nearest basis point.
    pub fn try_from_percent(percent: f64) -> ResultEngine<Self> {
        if !percent.is_finite() {
            return Err(EngineError::InvalidInput(
                "commission must be a finite number".to_string(),
            ));
        }
        let bps = (percent * 100.0).round();
        if !(0.0..=f64::from(Self::MAX_BPS)).contains(&bps) {
            return Err(EngineError::InvalidInput(format!(
                "commission must be between 0 and 100%, got {percent}"
            )));
        }
        Ok(Self(bps as i32))
    }

    #[must_use]
    pub const fn bps(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Commission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<i32> for Commission {
    type Error = EngineError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from_bps(value)
    }
}

impl From<Commission> for i32 {
    fn from(value: Commission) -> Self {
        value.0
    }
}

impl FromStr for Commission {
    type Err = EngineError;

    /// Parses a percentage with at most two decimals (`.` or `,`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidInput(format!("invalid commission: {s}"));

        let trimmed = s.trim().trim_end_matches('%').trim().replace(',', ".");
        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (trimmed.as_str(), ""),
        };
        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(invalid());
        }

        let whole: i32 = whole.parse().map_err(|_| invalid())?;
        let frac: i32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i32>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let bps = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(invalid)?;
        Self::try_from_bps(bps)
    }
}

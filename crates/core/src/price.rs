// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Money amounts in millimes.
//!
//! The dinar has three decimal places, so amounts are kept as integer
//! millimes and rendered as `2.000`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use crate::error::{Error, Result};

const MILLIMES_PER_DINAR: u64 = 1000;

/// A non-negative money amount in millimes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_millimes(millimes: u64) -> Self {
        Price(millimes)
    }

    pub fn from_dinars(dinars: u64) -> Self {
        Price(dinars * MILLIMES_PER_DINAR)
    }

    pub fn millimes(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `None` on overflow.
    pub fn checked_mul(self, factor: u32) -> Option<Price> {
        self.0.checked_mul(u64::from(factor)).map(Price)
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u32> for Price {
    type Output = Price;

    fn mul(self, rhs: u32) -> Price {
        Price(self.0.saturating_mul(u64::from(rhs)))
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, |acc, p| acc + p)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / MILLIMES_PER_DINAR, self.0 % MILLIMES_PER_DINAR)
    }
}

impl FromStr for Price {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::ValidationFailure(format!("invalid price '{s}'"));

        let (whole, frac) = match s.split_once(['.', ',']) {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 3 {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let dinars: u64 = whole.parse().map_err(|_| invalid())?;
        let millimes: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<3}").parse().map_err(|_| invalid())?
        };

        dinars
            .checked_mul(MILLIMES_PER_DINAR)
            .and_then(|m| m.checked_add(millimes))
            .map(Price)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
#[path = "price_tests.rs"]
mod tests;

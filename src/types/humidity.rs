// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relative humidity types.
//!
//! The humidifier reports its target as a string such as `"55RH"` and only
//! accepts targets within a configured range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Inclusive range of accepted target humidity values.
///
/// # Examples
///
/// ```
/// use humea_lib::types::HumidityRange;
///
/// let range = HumidityRange::default();
/// assert_eq!((range.min(), range.max()), (40, 75));
/// assert!(HumidityRange::new(80, 60).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct HumidityRange {
    min: u8,
    max: u8,
}

#[derive(Deserialize)]
struct RawRange {
    min: u8,
    max: u8,
}

impl HumidityRange {
    /// Default lower bound.
    pub const DEFAULT_MIN: u8 = 40;
    /// Default upper bound.
    pub const DEFAULT_MAX: u8 = 75;

    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` if `min > max`, or
    /// `ValueError::OutOfRange` if `max` exceeds 100.
    pub fn new(min: u8, max: u8) -> Result<Self, ValueError> {
        if max > TargetHumidity::MAX {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: u16::from(TargetHumidity::MAX),
                actual: u16::from(max),
            });
        }
        if min > max {
            return Err(ValueError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn min(&self) -> u8 {
        self.min
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn max(&self) -> u8 {
        self.max
    }

    /// Returns true if `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for HumidityRange {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl TryFrom<RawRange> for HumidityRange {
    type Error = ValueError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

/// Target relative humidity in percent (0-100).
///
/// # Examples
///
/// ```
/// use humea_lib::types::{HumidityRange, TargetHumidity};
///
/// let target = TargetHumidity::new(90).unwrap().clamped_to(HumidityRange::default());
/// assert_eq!(target.value(), 75);
/// assert_eq!(target.to_wire(), "75RH");
///
/// assert_eq!(TargetHumidity::parse_wire("55RH").map(|t| t.value()), Some(55));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetHumidity(u8);

impl TargetHumidity {
    /// Maximum relative humidity.
    pub const MAX: u8 = 100;

    /// Creates a target humidity value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is greater than 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > Self::MAX {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: u16::from(Self::MAX),
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Clamps the value into `range`.
    #[must_use]
    pub fn clamped_to(self, range: HumidityRange) -> Self {
        Self(self.0.clamp(range.min, range.max))
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the string the device expects, e.g. `"55RH"`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        format!("{}RH", self.0)
    }

    /// Extracts the first run of digits from a device reading.
    ///
    /// Returns `None` if there are no digits or the number exceeds 100.
    #[must_use]
    pub fn parse_wire(raw: &str) -> Option<Self> {
        let digits: String = raw
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse::<u8>().ok().and_then(|v| Self::new(v).ok())
    }
}

impl fmt::Display for TargetHumidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for TargetHumidity {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

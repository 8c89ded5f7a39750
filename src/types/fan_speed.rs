// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan speed option of the humidifier.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Fan speed selectable on the humidifier.
///
/// The device reports and accepts these as fixed strings.
///
/// # Examples
///
/// ```
/// use humea_lib::types::FanSpeed;
///
/// let speed: FanSpeed = "Turbo_speed".parse().unwrap();
/// assert_eq!(speed, FanSpeed::Turbo);
/// assert_eq!(FanSpeed::Low.as_str(), "Low_speed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FanSpeed {
    /// Lowest speed.
    #[default]
    Low,
    /// Medium speed.
    Medium,
    /// High speed.
    High,
    /// Turbo speed.
    Turbo,
}

impl FanSpeed {
    /// All options in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Turbo];

    /// Returns the string the device uses for this option.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low_speed",
            Self::Medium => "Medium_speed",
            Self::High => "High_speed",
            Self::Turbo => "Turbo_speed",
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanSpeed {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|speed| speed.as_str() == s)
            .ok_or_else(|| ValueError::InvalidFanSpeed(s.to_string()))
    }
}

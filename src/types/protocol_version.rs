// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local protocol version spoken by the device.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Version of the local key-value protocol (`major.minor`, e.g. `3.4`).
///
/// # Examples
///
/// ```
/// use humea_lib::types::ProtocolVersion;
///
/// let version: ProtocolVersion = "3.3".parse().unwrap();
/// assert_eq!(version.to_string(), "3.3");
/// assert_eq!(ProtocolVersion::default().to_string(), "3.4");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion {
    major: u8,
    minor: u8,
}

impl ProtocolVersion {
    /// Version used when the configuration does not name one.
    pub const DEFAULT: Self = Self { major: 3, minor: 4 };

    /// Creates a version from its components.
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(&self) -> u8 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(&self) -> u8 {
        self.minor
    }

    /// Returns the version as a float, the form most device libraries take.
    #[must_use]
    pub fn as_f32(&self) -> f32 {
        f32::from(self.major) + f32::from(self.minor) / 10.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidProtocolVersion(s.to_string());
        let trimmed = s.trim();
        let (major, minor) = trimmed.split_once('.').unwrap_or((trimmed, "0"));

        let major = major.parse::<u8>().map_err(|_| invalid())?;
        let minor = minor.parse::<u8>().map_err(|_| invalid())?;
        if minor > 9 {
            return Err(invalid());
        }
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(value: ProtocolVersion) -> Self {
        value.to_string()
    }
}

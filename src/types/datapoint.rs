// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data point keys and values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Known data points of the humidifier.
///
/// The device addresses every attribute by a numbered string key; this enum
/// gives those keys names.
///
/// # Examples
///
/// ```
/// use humea_lib::types::DataPoint;
///
/// assert_eq!(DataPoint::TargetHumidity.key(), "101");
/// assert_eq!(DataPoint::from_key("14"), Some(DataPoint::CurrentHumidity));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataPoint {
    /// Main power switch (bool).
    Power,
    /// Ambient temperature in degrees Celsius.
    Temperature,
    /// Measured relative humidity in percent.
    CurrentHumidity,
    /// Night mode switch (bool).
    NightMode,
    /// Constant humidity mode switch (bool).
    ConstantMode,
    /// Target relative humidity, reported as `"NNRH"`.
    TargetHumidity,
    /// Water tank level indicator.
    WaterLevel,
    /// Fan speed option.
    FanSpeed,
}

impl DataPoint {
    /// All known data points.
    pub const ALL: [Self; 8] = [
        Self::Power,
        Self::Temperature,
        Self::CurrentHumidity,
        Self::NightMode,
        Self::ConstantMode,
        Self::TargetHumidity,
        Self::WaterLevel,
        Self::FanSpeed,
    ];

    /// Returns the key the device uses for this data point.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Power => "1",
            Self::Temperature => "10",
            Self::CurrentHumidity => "14",
            Self::NightMode => "16",
            Self::ConstantMode => "19",
            Self::TargetHumidity => "101",
            Self::WaterLevel => "102",
            Self::FanSpeed => "103",
        }
    }

    /// Looks up a data point by its device key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dp| dp.key() == key)
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Value of a single data point.
///
/// Devices report booleans, integers, floats, or strings depending on the
/// key. Anything else is kept verbatim in [`DpValue::Raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DpValue {
    /// Boolean switch value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// String value (enumerations, `"55RH"` style readings).
    Text(String),
    /// Any other JSON value.
    Raw(Value),
}

impl DpValue {
    /// Interprets the value as a switch state.
    ///
    /// Integers are true when non-zero; strings accept `true`/`false`/`1`/`0`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(n) => Some(*n != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Some(true),
                "false" | "0" | "off" => Some(false),
                _ => None,
            },
            Self::Float(_) | Self::Raw(_) => None,
        }
    }

    /// Interprets the value as a number, parsing numeric strings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::Raw(_) => None,
        }
    }

    /// Interprets the value as an integer, parsing numeric strings.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::Float(_) | Self::Raw(_) => None,
        }
    }

    /// Returns the string content for text values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Raw(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for DpValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DpValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for DpValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for DpValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DpValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DpValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for DpValue {
    fn from(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Raw(value))
    }
}

impl From<DpValue> for Value {
    fn from(value: DpValue) -> Self {
        match value {
            DpValue::Bool(b) => Value::Bool(b),
            DpValue::Integer(n) => Value::from(n),
            DpValue::Float(x) => Value::from(x),
            DpValue::Text(s) => Value::String(s),
            DpValue::Raw(v) => v,
        }
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed view of a humidifier status.

use crate::response::DeviceStatus;
use crate::types::{DataPoint, DpValue, FanSpeed, TargetHumidity};

/// Humidifier state decoded from a [`DeviceStatus`].
///
/// Every field is optional: a missing or unparsable data point means that
/// capability is currently unavailable, not that the whole read failed.
///
/// # Examples
///
/// ```
/// use humea_lib::response::{DeviceStatus, HumidifierState};
///
/// let status: DeviceStatus = serde_json::from_str(
///     r#"{"dps":{"1":true,"14":"48","101":"55RH","103":"High_speed"}}"#,
/// ).unwrap();
/// let state = HumidifierState::from_status(&status);
///
/// assert_eq!(state.power, Some(true));
/// assert_eq!(state.current_humidity, Some(48.0));
/// assert_eq!(state.target_humidity.map(|t| t.value()), Some(55));
/// assert!(state.temperature.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumidifierState {
    /// Main power.
    pub power: Option<bool>,
    /// Night mode.
    pub night_mode: Option<bool>,
    /// Constant humidity mode.
    pub constant_mode: Option<bool>,
    /// Measured relative humidity (%).
    pub current_humidity: Option<f64>,
    /// Ambient temperature (°C).
    pub temperature: Option<f64>,
    /// Target relative humidity.
    pub target_humidity: Option<TargetHumidity>,
    /// Water level indicator as reported.
    pub water_level: Option<String>,
    /// Fan speed.
    pub fan_speed: Option<FanSpeed>,
}

impl HumidifierState {
    /// Decodes the known data points of `status`.
    #[must_use]
    pub fn from_status(status: &DeviceStatus) -> Self {
        let point = |dp: DataPoint| status.point(dp);

        Self {
            power: point(DataPoint::Power).and_then(DpValue::as_bool),
            night_mode: point(DataPoint::NightMode).and_then(DpValue::as_bool),
            constant_mode: point(DataPoint::ConstantMode).and_then(DpValue::as_bool),
            current_humidity: point(DataPoint::CurrentHumidity).and_then(DpValue::as_f64),
            temperature: point(DataPoint::Temperature).and_then(DpValue::as_f64),
            target_humidity: point(DataPoint::TargetHumidity)
                .and_then(|v| TargetHumidity::parse_wire(&v.to_string())),
            water_level: point(DataPoint::WaterLevel).map(ToString::to_string),
            fan_speed: point(DataPoint::FanSpeed)
                .and_then(DpValue::as_str)
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Returns true if no capability could be decoded.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&DeviceStatus> for HumidifierState {
    fn from(status: &DeviceStatus) -> Self {
        Self::from_status(status)
    }
}

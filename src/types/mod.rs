// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for humidifier control.
//!
//! Each type validates its value at construction time.
//!
//! # Types
//!
//! - [`DataPoint`] - Named data point keys
//! - [`DpValue`] - Heterogeneous data point value
//! - [`FanSpeed`] - Fan speed option
//! - [`HumidityRange`] / [`TargetHumidity`] - Target humidity and its bounds
//! - [`ProtocolVersion`] - Local protocol version

mod datapoint;
mod fan_speed;
mod humidity;
mod protocol_version;

pub use datapoint::{DataPoint, DpValue};
pub use fan_speed::FanSpeed;
pub use humidity::{HumidityRange, TargetHumidity};
pub use protocol_version::ProtocolVersion;

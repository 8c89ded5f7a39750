// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Humea` Lib - A Rust library managing local connections to Klarta Humea
//! humidifiers.
//!
//! The humidifier speaks a Tuya-style local protocol: its state is a mapping
//! of numbered data points (`dps`). This library keeps one persistent
//! connection per device, shared by every consumer, and shields callers from
//! the quirks of the device.
//!
//! # Supported Features
//!
//! - **Status reads**: cached, throttled, and de-duplicated per device
//! - **Response normalization**: direct and wrapped payload shapes
//! - **Value writes**: power, night mode, constant mode, target humidity, fan speed
//! - **Self-healing**: reconnect after repeated rejections or failures
//!
//! # Device Communication
//!
//! The wire protocol itself is provided by a device library plugged in
//! through the [`protocol::Connector`] and [`protocol::DeviceHandle`] traits.
//! Their methods may block; the manager runs them on tokio's blocking pool.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use humea_lib::manager::{DeviceConfig, ManagerRegistry};
//! use humea_lib::types::DataPoint;
//! # use humea_lib::protocol::Connector;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> humea_lib::Result<()> {
//! let registry = ManagerRegistry::new();
//! let config = DeviceConfig::new("bf1234", "0123456789abcdef", "192.168.1.40")
//!     .with_name("Bedroom Humidifier");
//! let manager = registry.get_or_create(&config, connector)?;
//!
//! // Never fails; degrades to the last known (or empty) state
//! let status = manager.get_status().await;
//! match status.point(DataPoint::CurrentHumidity) {
//!     Some(value) => println!("Humidity: {value}%"),
//!     None => println!("Humidity unavailable"),
//! }
//!
//! // Returns false on failure
//! if !manager.set_power(true).await {
//!     eprintln!("Could not turn the humidifier on");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Diagnostics are emitted through [`tracing`]. The library installs no
//! subscriber; the shared secret is never logged.

mod identity;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod response;
pub mod types;

pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use identity::{DeviceIdentity, RegistryKey};
pub use manager::{
    DeviceConfig, DeviceManager, HealthCounters, ManagerConfig, ManagerRegistry, ManagerStats,
};
pub use protocol::{Connector, DeviceHandle, SocketOptions};
pub use response::{DeviceStatus, HumidifierState};
pub use types::{DataPoint, DpValue, FanSpeed, HumidityRange, ProtocolVersion, TargetHumidity};

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager and registry.
//!
//! # Overview
//!
//! The [`DeviceManager`] owns the persistent connection to one humidifier and
//! coordinates every exchange with it:
//!
//! - **Single-flight connection**: concurrent callers share one connection
//!   attempt; reconnects are serialized with reads and writes
//! - **Freshness cache**: recent snapshots are served without touching the
//!   device, and fetches are throttled
//! - **Completeness fallback**: thin responses are replaced by the last
//!   complete snapshot
//! - **Health tracking**: protocol rejections and consecutive failures trigger
//!   a reconnect
//!
//! The [`ManagerRegistry`] hands out one shared manager per device.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use humea_lib::manager::{DeviceConfig, ManagerRegistry};
//! use humea_lib::types::{FanSpeed, TargetHumidity};
//! # use humea_lib::protocol::Connector;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> humea_lib::Result<()> {
//! let registry = ManagerRegistry::new();
//! let config = DeviceConfig::new("bf1234", "0123456789abcdef", "192.168.1.40");
//! let manager = registry.get_or_create(&config, connector)?;
//!
//! let state = manager.humidifier_state().await;
//! println!("Humidity: {:?}", state.current_humidity);
//!
//! manager.set_fan_speed(FanSpeed::High).await;
//! manager.set_target_humidity(TargetHumidity::new(55)?).await;
//!
//! registry.shutdown_all().await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod connection;
mod device_config;
mod device_manager;
mod health;
mod registry;

pub use device_config::{DeviceConfig, ManagerConfig};
pub use device_manager::{DeviceManager, ManagerStats};
pub use health::HealthCounters;
pub use registry::ManagerRegistry;

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types for the device manager.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::identity::DeviceIdentity;
use crate::protocol::SocketOptions;
use crate::types::{HumidityRange, ProtocolVersion};

/// Configuration of one humidifier, as entered by the user.
///
/// # Examples
///
/// ```
/// use humea_lib::manager::DeviceConfig;
///
/// let config = DeviceConfig::new("bf1234", "0123456789abcdef", "192.168.1.40")
///     .with_name("Bedroom Humidifier");
/// assert_eq!(config.protocol_version.to_string(), "3.4");
///
/// // Also loadable from JSON; version and range fall back to defaults
/// let config: DeviceConfig = serde_json::from_str(
///     r#"{"device_id":"bf1234","local_key":"k","ip_address":"192.168.1.40"}"#,
/// ).unwrap();
/// assert_eq!(config.name, "Klarta Humea");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Device id.
    pub device_id: String,
    /// Shared secret (local key).
    pub local_key: String,
    /// Network address of the device.
    pub ip_address: String,
    /// Protocol version, `3.4` when absent.
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    /// Bounds for target humidity writes.
    #[serde(default)]
    pub humidity_range: HumidityRange,
}

fn default_name() -> String {
    DeviceConfig::DEFAULT_NAME.to_string()
}

impl DeviceConfig {
    /// Name used when none is configured.
    pub const DEFAULT_NAME: &'static str = "Klarta Humea";

    /// Creates a configuration with default name, version, and range.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        local_key: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            name: default_name(),
            device_id: device_id.into(),
            local_key: local_key.into(),
            ip_address: ip_address.into(),
            protocol_version: ProtocolVersion::default(),
            humidity_range: HumidityRange::default(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the protocol version.
    #[must_use]
    pub fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Sets the humidity bounds.
    #[must_use]
    pub fn with_humidity_range(mut self, range: HumidityRange) -> Self {
        self.humidity_range = range;
        self
    }

    /// Returns the identity used to connect.
    #[must_use]
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.device_id.trim(),
            self.ip_address.trim(),
            self.protocol_version,
            self.local_key.clone(),
        )
    }

    /// Checks that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidConfiguration` naming the first empty field.
    pub fn validate(&self) -> Result<(), DeviceError> {
        for (field, value) in [
            ("device_id", &self.device_id),
            ("local_key", &self.local_key),
            ("ip_address", &self.ip_address),
        ] {
            if value.trim().is_empty() {
                return Err(DeviceError::InvalidConfiguration(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("device_id", &self.device_id)
            .field("local_key", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .field("protocol_version", &self.protocol_version)
            .field("humidity_range", &self.humidity_range)
            .finish()
    }
}

/// Timing and threshold policy of a [`DeviceManager`](super::DeviceManager).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use humea_lib::manager::ManagerConfig;
///
/// let config = ManagerConfig::new()
///     .with_status_timeout(Duration::from_secs(4))
///     .with_complete_threshold(2);
/// assert_eq!(config.validity_window, ManagerConfig::DEFAULT_VALIDITY_WINDOW);
/// ```
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// A snapshot younger than this is served without a fetch.
    pub validity_window: Duration,
    /// Two fetches are never issued closer together than this.
    pub min_fetch_interval: Duration,
    /// Deadline of one connection attempt (open and probe).
    pub connect_timeout: Duration,
    /// Deadline of one status read.
    pub status_timeout: Duration,
    /// Deadline of one value write.
    pub set_timeout: Duration,
    /// Read attempts per fetch.
    pub read_attempts: u32,
    /// Pause before retrying after an invalid payload.
    pub invalid_backoff: Duration,
    /// Pause before retrying after a timeout or transport failure.
    pub retry_delay: Duration,
    /// A keep-alive is sent before a write once this much time has passed.
    pub keep_alive_interval: Duration,
    /// Protocol rejections that trigger a reconnect.
    pub rejection_threshold: u32,
    /// Consecutive failures that trigger a reconnect.
    pub failure_threshold: u32,
    /// Fetches with at most this many points are incomplete.
    pub complete_threshold: usize,
    /// Socket options for every connection.
    pub socket: SocketOptions,
}

impl ManagerConfig {
    /// Default cache validity window.
    pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(10);
    /// Default minimum spacing between fetches.
    pub const DEFAULT_MIN_FETCH_INTERVAL: Duration = Duration::from_secs(5);
    /// Default connection attempt timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default status read timeout.
    pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default write timeout.
    pub const DEFAULT_SET_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default read attempts.
    pub const DEFAULT_READ_ATTEMPTS: u32 = 2;
    /// Default pause after an invalid payload.
    pub const DEFAULT_INVALID_BACKOFF: Duration = Duration::from_millis(500);
    /// Default pause after a failed attempt.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
    /// Default keep-alive interval.
    pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
    /// Default protocol rejection threshold.
    pub const DEFAULT_REJECTION_THRESHOLD: u32 = 2;
    /// Default consecutive failure threshold.
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    /// Default completeness threshold.
    pub const DEFAULT_COMPLETE_THRESHOLD: usize = 1;

    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache validity window.
    #[must_use]
    pub fn with_validity_window(mut self, window: Duration) -> Self {
        self.validity_window = window;
        self
    }

    /// Sets the minimum spacing between fetches.
    #[must_use]
    pub fn with_min_fetch_interval(mut self, interval: Duration) -> Self {
        self.min_fetch_interval = interval;
        self
    }

    /// Sets the connection attempt timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the status read timeout.
    #[must_use]
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    #[must_use]
    pub fn with_set_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout = timeout;
        self
    }

    /// Sets the number of read attempts (at least one).
    #[must_use]
    pub fn with_read_attempts(mut self, attempts: u32) -> Self {
        self.read_attempts = attempts.max(1);
        self
    }

    /// Sets the pause after an invalid payload.
    #[must_use]
    pub fn with_invalid_backoff(mut self, backoff: Duration) -> Self {
        self.invalid_backoff = backoff;
        self
    }

    /// Sets the pause after a failed attempt.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Sets the protocol rejection threshold (at least one).
    #[must_use]
    pub fn with_rejection_threshold(mut self, threshold: u32) -> Self {
        self.rejection_threshold = threshold.max(1);
        self
    }

    /// Sets the consecutive failure threshold (at least one).
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets the completeness threshold.
    #[must_use]
    pub fn with_complete_threshold(mut self, threshold: usize) -> Self {
        self.complete_threshold = threshold;
        self
    }

    /// Sets the socket options.
    #[must_use]
    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            validity_window: Self::DEFAULT_VALIDITY_WINDOW,
            min_fetch_interval: Self::DEFAULT_MIN_FETCH_INTERVAL,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            status_timeout: Self::DEFAULT_STATUS_TIMEOUT,
            set_timeout: Self::DEFAULT_SET_TIMEOUT,
            read_attempts: Self::DEFAULT_READ_ATTEMPTS,
            invalid_backoff: Self::DEFAULT_INVALID_BACKOFF,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            keep_alive_interval: Self::DEFAULT_KEEP_ALIVE_INTERVAL,
            rejection_threshold: Self::DEFAULT_REJECTION_THRESHOLD,
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
            complete_threshold: Self::DEFAULT_COMPLETE_THRESHOLD,
            socket: SocketOptions::default(),
        }
    }
}

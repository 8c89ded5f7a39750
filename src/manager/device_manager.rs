// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device manager coordinating reads, writes, and connection health.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{Error, ProtocolError};
use crate::identity::DeviceIdentity;
use crate::protocol::Connector;
use crate::response::{DeviceStatus, HumidifierState, normalize, protocol_rejection, validate};
use crate::types::{DataPoint, DpValue, FanSpeed, HumidityRange, TargetHumidity};

use super::cache::{CacheLookup, FetchGuard, FreshnessCache};
use super::connection::{Connection, InitFailure};
use super::device_config::{DeviceConfig, ManagerConfig};
use super::health::{HealthCounters, HealthTracker, Verdict};

/// Manager for one humidifier.
///
/// A single `DeviceManager` owns the connection to a device and is shared by
/// every consumer of that device (usually through a
/// [`ManagerRegistry`](super::ManagerRegistry)). All methods take `&self` and
/// are safe to call concurrently.
///
/// Reads never fail: on any error they degrade to the best data known.
/// Writes report failure as `false` (or as an [`Error`] through
/// [`try_set_value`](Self::try_set_value)).
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use humea_lib::manager::{DeviceConfig, DeviceManager};
/// # use humea_lib::protocol::Connector;
///
/// # async fn example(connector: Arc<dyn Connector>) -> humea_lib::Result<()> {
/// let config = DeviceConfig::new("bf1234", "0123456789abcdef", "192.168.1.40");
/// let manager = DeviceManager::new(&config, connector)?;
///
/// let status = manager.get_status().await;
/// println!("{} data points", status.len());
///
/// if !manager.set_power(true).await {
///     eprintln!("power on failed");
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeviceManager {
    identity: DeviceIdentity,
    config: ManagerConfig,
    humidity_range: HumidityRange,
    connection: Connection,
    cache: Mutex<FreshnessCache>,
    health: Mutex<HealthTracker>,
}

/// Point-in-time diagnostics of a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerStats {
    /// Current failure counters.
    pub counters: HealthCounters,
    /// Reconnects attempted since creation.
    pub reconnects: u64,
    /// Time of the last fully successful exchange.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Time of the last reconnect attempt.
    pub last_reconnect_at: Option<DateTime<Utc>>,
    /// Whether a connection is currently established.
    pub connected: bool,
    /// Data points in the cached snapshot.
    pub cached_points: usize,
}

/// How one read attempt ended.
enum ReadOutcome {
    /// A snapshot to serve.
    Served(DeviceStatus),
    /// The payload could not be normalized.
    Invalid,
    /// Stop trying and serve the cache.
    GiveUp,
    /// The exchange failed; try again if attempts remain.
    Failed,
}

impl DeviceManager {
    /// Creates a manager with the default [`ManagerConfig`].
    ///
    /// No connection is opened until the first operation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if the configuration is invalid.
    pub fn new(config: &DeviceConfig, connector: Arc<dyn Connector>) -> Result<Self, Error> {
        Self::with_config(config, connector, ManagerConfig::default())
    }

    /// Creates a manager with a custom timing and threshold policy.
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if the configuration is invalid.
    pub fn with_config(
        config: &DeviceConfig,
        connector: Arc<dyn Connector>,
        manager_config: ManagerConfig,
    ) -> Result<Self, Error> {
        config.validate()?;

        let identity = config.identity();
        let connection = Connection::new(
            identity.clone(),
            connector,
            manager_config.socket,
            manager_config.connect_timeout,
        );
        let cache = FreshnessCache::new(
            manager_config.validity_window,
            manager_config.min_fetch_interval,
            manager_config.complete_threshold,
        );
        let health = HealthTracker::new(
            manager_config.rejection_threshold,
            manager_config.failure_threshold,
        );

        tracing::debug!(device = %identity, name = %config.name, "Device manager created");

        Ok(Self {
            identity,
            config: manager_config,
            humidity_range: config.humidity_range,
            connection,
            cache: Mutex::new(cache),
            health: Mutex::new(health),
        })
    }

    /// Returns the identity of the managed device.
    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Returns the bounds applied to target humidity writes.
    #[must_use]
    pub fn humidity_range(&self) -> HumidityRange {
        self.humidity_range
    }

    /// Returns the timing and threshold policy.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns true if a connection is currently established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_initialized()
    }

    /// Returns the current failure counters.
    #[must_use]
    pub fn counters(&self) -> HealthCounters {
        self.health.lock().counters()
    }

    /// Returns a diagnostics snapshot.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        let cached_points = self.cache.lock().len();
        let health = self.health.lock();
        ManagerStats {
            counters: health.counters(),
            reconnects: health.reconnects(),
            last_success_at: health.last_success_at(),
            last_reconnect_at: health.last_reconnect_at(),
            connected: self.connection.is_initialized(),
            cached_points,
        }
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Returns the device state.
    ///
    /// Serves the cached snapshot while it is fresh, while fetches are
    /// throttled, or while another caller is fetching. Otherwise reads the
    /// device. Never fails: every error path returns the best known snapshot,
    /// which is empty when nothing was ever fetched.
    pub async fn get_status(&self) -> DeviceStatus {
        if let Err(failure) = self.connection.ensure_initialized().await {
            tracing::error!(
                device = %self.identity,
                error = %failure.error,
                "Connection unavailable"
            );
            self.on_init_failure(&failure).await;
            return self.cache.lock().cached_or_empty();
        }

        let lookup = self.cache.lock().begin_fetch(Instant::now());
        match lookup {
            CacheLookup::Fresh(status)
            | CacheLookup::Throttled(status)
            | CacheLookup::InFlight(status) => return status,
            CacheLookup::Fetch => {}
        }

        let _guard = FetchGuard::claimed(&self.cache);
        self.fetch_status().await
    }

    /// Returns the typed view of [`get_status`](Self::get_status).
    pub async fn humidifier_state(&self) -> HumidifierState {
        HumidifierState::from_status(&self.get_status().await)
    }

    async fn fetch_status(&self) -> DeviceStatus {
        let attempts = self.config.read_attempts;

        for attempt in 1..=attempts {
            let remaining = attempt < attempts;

            match self.read_once(attempt).await {
                ReadOutcome::Served(status) => return status,
                ReadOutcome::GiveUp => break,
                ReadOutcome::Invalid => {
                    if !remaining {
                        return self.cache.lock().fallback();
                    }
                    tracing::warn!(
                        device = %self.identity,
                        attempt,
                        "Invalid response, retrying"
                    );
                    tokio::time::sleep(self.config.invalid_backoff).await;
                }
                ReadOutcome::Failed => {
                    if remaining {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        self.cache.lock().cached_or_empty()
    }

    async fn read_once(&self, attempt: u32) -> ReadOutcome {
        tracing::debug!(device = %self.identity, attempt, "Fetching status");

        let raw = match self.connection.read_state(self.config.status_timeout).await {
            Ok(raw) => raw,
            Err(ProtocolError::Rejected(reason)) => {
                self.on_rejection(&reason).await;
                return ReadOutcome::GiveUp;
            }
            Err(e) => {
                self.on_failure(&e).await;
                return ReadOutcome::Failed;
            }
        };

        if let Some(reason) = protocol_rejection(&raw) {
            self.on_rejection(&reason).await;
            return ReadOutcome::GiveUp;
        }

        match parse_status(&raw) {
            Some(status) => {
                self.health.lock().record_success();
                let served = self.cache.lock().store(status, Instant::now());
                ReadOutcome::Served(served)
            }
            None => {
                self.health.lock().record_invalid();
                ReadOutcome::Invalid
            }
        }
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Writes one data point, returning `true` on success.
    ///
    /// A failure is never retried; the caller may resubmit.
    pub async fn set_value(&self, dp: &str, value: impl Into<DpValue>) -> bool {
        self.try_set_value(dp, value).await.is_ok()
    }

    /// Writes one data point.
    ///
    /// On success the cache is invalidated so the next read fetches.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the connection is unavailable, the write
    /// times out or fails, or the device rejects it.
    pub async fn try_set_value(&self, dp: &str, value: impl Into<DpValue>) -> Result<(), Error> {
        let value = value.into();

        if let Err(failure) = self.connection.ensure_initialized().await {
            self.on_init_failure(&failure).await;
            return Err(failure.error.into());
        }

        if self
            .connection
            .keep_alive_due(self.config.keep_alive_interval)
            && let Err(e) = self
                .connection
                .send_keep_alive(self.config.set_timeout)
                .await
        {
            tracing::debug!(device = %self.identity, error = %e, "Keep-alive failed");
        }

        tracing::debug!(device = %self.identity, dp, value = %value, "Setting value");
        let result = self
            .connection
            .write_value(dp.to_string(), value, self.config.set_timeout)
            .await
            .and_then(|reply| match protocol_rejection(&reply) {
                Some(reason) => Err(ProtocolError::Rejected(reason)),
                None => Ok(reply),
            });

        match result {
            Ok(_) => {
                self.health.lock().record_success();
                self.cache.lock().invalidate();
                tracing::debug!(device = %self.identity, dp, "Value set");
                Ok(())
            }
            Err(ProtocolError::Rejected(reason)) => {
                self.on_rejection(&reason).await;
                Err(ProtocolError::Rejected(reason).into())
            }
            Err(e) => {
                self.on_failure(&e).await;
                Err(e.into())
            }
        }
    }

    /// Turns the humidifier on or off.
    pub async fn set_power(&self, on: bool) -> bool {
        self.set_value(DataPoint::Power.key(), on).await
    }

    /// Enables or disables night mode.
    pub async fn set_night_mode(&self, on: bool) -> bool {
        self.set_value(DataPoint::NightMode.key(), on).await
    }

    /// Enables or disables constant humidity mode.
    pub async fn set_constant_mode(&self, on: bool) -> bool {
        self.set_value(DataPoint::ConstantMode.key(), on).await
    }

    /// Sets the target humidity, clamped to the configured range.
    pub async fn set_target_humidity(&self, target: TargetHumidity) -> bool {
        let clamped = target.clamped_to(self.humidity_range);
        if clamped != target {
            tracing::debug!(
                device = %self.identity,
                requested = target.value(),
                clamped = clamped.value(),
                "Target humidity clamped"
            );
        }
        self.set_value(DataPoint::TargetHumidity.key(), clamped.to_wire())
            .await
    }

    /// Sets the fan speed.
    pub async fn set_fan_speed(&self, speed: FanSpeed) -> bool {
        self.set_value(DataPoint::FanSpeed.key(), speed.as_str())
            .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Discards the connection and opens a fresh one.
    ///
    /// Counters are cleared when the new connection is established.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the new connection cannot be opened.
    pub async fn reconnect(&self) -> Result<(), Error> {
        let result = self.connection.reconnect().await;
        self.health.lock().record_reconnect(result.is_ok());
        result.map_err(Error::from)
    }

    /// Probes the device, returning `true` if it answered.
    pub async fn send_keep_alive(&self) -> bool {
        match self
            .connection
            .send_keep_alive(self.config.set_timeout)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(device = %self.identity, error = %e, "Keep-alive failed");
                false
            }
        }
    }

    /// Closes the connection. The next operation reconnects.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the handle is not released within the
    /// connect timeout, or the worker closing it fails.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.connection.disconnect().await.map_err(Error::from)
    }

    async fn on_rejection(&self, reason: &str) {
        tracing::error!(device = %self.identity, reason, "Protocol rejection");
        let verdict = self.health.lock().record_rejection();
        self.apply(verdict, "protocol rejections").await;
    }

    /// Counts a failed connection attempt once, against the caller that ran it.
    async fn on_init_failure(&self, failure: &InitFailure) {
        if failure.attempted {
            self.on_failure(&failure.error).await;
        }
    }

    async fn on_failure(&self, error: &ProtocolError) {
        let verdict = {
            let mut health = self.health.lock();
            if error.is_timeout() {
                health.record_timeout()
            } else {
                health.record_failure()
            }
        };
        tracing::error!(device = %self.identity, error = %error, "Exchange failed");
        self.apply(verdict, "consecutive failures").await;
    }

    async fn apply(&self, verdict: Verdict, cause: &'static str) {
        if verdict == Verdict::Reconnect {
            tracing::warn!(device = %self.identity, cause, "Threshold reached, reconnecting");
            if let Err(e) = self.reconnect().await {
                tracing::error!(device = %self.identity, error = %e, "Reconnect failed");
            }
        }
    }
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("identity", &self.identity)
            .field("connection", &self.connection)
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}

/// Normalizes and validates a raw payload.
fn parse_status(raw: &Value) -> Option<DeviceStatus> {
    let normalized = normalize(raw);
    let shape = normalized.shape();
    let canonical = normalized.into_canonical().filter(validate)?;

    match DeviceStatus::try_from(canonical) {
        Ok(status) => {
            tracing::debug!(shape, dps = status.len(), "Response normalized");
            Some(status)
        }
        Err(e) => {
            tracing::warn!(shape, error = %e, "Response could not be decoded");
            None
        }
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle of the single physical connection to a device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::error::ProtocolError;
use crate::identity::DeviceIdentity;
use crate::protocol::{Connector, DeviceHandle, SocketOptions};
use crate::types::DpValue;

/// Slot holding the open handle, if any.
///
/// Locked by worker threads for the whole duration of a blocking call, so a
/// reconnect waits for an exchange in progress and vice versa.
type HandleSlot = Arc<parking_lot::Mutex<Option<Box<dyn DeviceHandle>>>>;

/// A failed [`Connection::ensure_initialized`].
#[derive(Debug)]
pub(crate) struct InitFailure {
    pub error: ProtocolError,
    /// False when the caller only waited on another caller's attempt.
    pub attempted: bool,
}

/// Owns the connection handle of one device.
///
/// Initialization and reconnection are single-flight: they run under one
/// async lock, and callers that queued behind an attempt observe its outcome
/// instead of starting their own.
pub(crate) struct Connection {
    identity: DeviceIdentity,
    connector: Arc<dyn Connector>,
    socket: SocketOptions,
    connect_timeout: Duration,
    handle: HandleSlot,
    initialized: AtomicBool,
    attempts: AtomicU64,
    lifecycle: tokio::sync::Mutex<Option<String>>,
    last_keep_alive: parking_lot::Mutex<Option<Instant>>,
}

impl Connection {
    pub fn new(
        identity: DeviceIdentity,
        connector: Arc<dyn Connector>,
        socket: SocketOptions,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            connector,
            socket,
            connect_timeout,
            handle: Arc::new(parking_lot::Mutex::new(None)),
            initialized: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            lifecycle: tokio::sync::Mutex::new(None),
            last_keep_alive: parking_lot::Mutex::new(None),
        }
    }

    /// Returns true once a connection has been established and not torn down.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Opens the connection unless it is already open.
    ///
    /// Concurrent callers wait for the single attempt in progress and share
    /// its outcome. Only the caller that ran a failed attempt gets
    /// [`InitFailure::attempted`] set.
    pub async fn ensure_initialized(&self) -> Result<(), InitFailure> {
        if self.is_initialized() {
            return Ok(());
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_error = self.lifecycle.lock().await;

        if self.is_initialized() {
            return Ok(());
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            // Someone else attempted while we waited; report their outcome.
            return match last_error.as_ref() {
                Some(message) => Err(InitFailure {
                    error: ProtocolError::ConnectionFailed(message.clone()),
                    attempted: false,
                }),
                None => Ok(()),
            };
        }

        tracing::info!(device = %self.identity, "Initializing persistent connection");
        let result = self.open().await;
        self.finish_attempt(&mut last_error, &result);
        result.map_err(|error| InitFailure {
            error,
            attempted: true,
        })
    }

    /// Discards any existing handle and opens a fresh connection.
    pub async fn reconnect(&self) -> Result<(), ProtocolError> {
        let mut last_error = self.lifecycle.lock().await;

        tracing::warn!(device = %self.identity, "Reconnecting to device");
        self.initialized.store(false, Ordering::Release);
        let result = self.open().await;
        self.finish_attempt(&mut last_error, &result);
        result
    }

    /// Closes the connection. The next operation reconnects.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        let _lifecycle = self.lifecycle.lock().await;

        self.initialized.store(false, Ordering::Release);
        let slot = Arc::clone(&self.handle);
        let task = run_blocking(move || {
            if let Some(mut handle) = slot.lock().take() {
                handle.close();
            }
            Ok(())
        });

        // A worker abandoned by a timed-out exchange may still hold the slot.
        tokio::time::timeout(self.connect_timeout, task)
            .await
            .map_err(|_| ProtocolError::Timeout(millis(self.connect_timeout)))??;

        tracing::info!(device = %self.identity, "Connection closed");
        Ok(())
    }

    /// Returns true if no keep-alive succeeded within `interval`.
    pub fn keep_alive_due(&self, interval: Duration) -> bool {
        self.last_keep_alive
            .lock()
            .is_none_or(|at| at.elapsed() > interval)
    }

    /// Probes the device to keep the socket from being dropped.
    pub async fn send_keep_alive(&self, deadline: Duration) -> Result<(), ProtocolError> {
        self.with_handle(deadline, |handle| handle.probe()).await?;
        *self.last_keep_alive.lock() = Some(Instant::now());
        tracing::debug!(device = %self.identity, "Keep-alive sent");
        Ok(())
    }

    /// Reads the raw device state.
    pub async fn read_state(&self, deadline: Duration) -> Result<Value, ProtocolError> {
        self.with_handle(deadline, |handle| handle.read_state())
            .await
    }

    /// Writes one data point and returns the raw reply.
    pub async fn write_value(
        &self,
        dp: String,
        value: DpValue,
        deadline: Duration,
    ) -> Result<Value, ProtocolError> {
        self.with_handle(deadline, move |handle| handle.write_value(&dp, &value))
            .await
    }

    /// Runs `op` against the open handle on a worker thread.
    async fn with_handle<T, F>(&self, deadline: Duration, op: F) -> Result<T, ProtocolError>
    where
        F: FnOnce(&mut dyn DeviceHandle) -> Result<T, ProtocolError> + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::clone(&self.handle);
        let task = run_blocking(move || match slot.lock().as_mut() {
            Some(handle) => op(handle.as_mut()),
            None => Err(ProtocolError::NotConnected),
        });

        tokio::time::timeout(deadline, task)
            .await
            .map_err(|_| ProtocolError::Timeout(millis(deadline)))?
    }

    /// Replaces the handle with a freshly opened and probed one.
    async fn open(&self) -> Result<(), ProtocolError> {
        let slot = Arc::clone(&self.handle);
        let connector = Arc::clone(&self.connector);
        let identity = self.identity.clone();
        let socket = self.socket;

        let task = run_blocking(move || {
            let mut slot = slot.lock();
            if let Some(mut old) = slot.take() {
                old.close();
            }

            let mut handle = connector.open(&identity, &socket)?;
            if let Err(e) = handle.probe() {
                handle.close();
                return Err(e);
            }
            *slot = Some(handle);
            Ok(())
        });

        let result = tokio::time::timeout(self.connect_timeout, task)
            .await
            .map_err(|_| ProtocolError::Timeout(millis(self.connect_timeout)))
            .and_then(|inner| inner);

        match &result {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!(device = %self.identity, "Persistent connection established");
            }
            Err(e) => {
                tracing::error!(device = %self.identity, error = %e, "Connection failed");
            }
        }
        result
    }

    fn finish_attempt(&self, last_error: &mut Option<String>, result: &Result<(), ProtocolError>) {
        *last_error = result.as_ref().err().map(ToString::to_string);
        self.attempts.fetch_add(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("identity", &self.identity)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Runs a blocking device call on the worker pool.
async fn run_blocking<T, F>(f: F) -> Result<T, ProtocolError>
where
    F: FnOnce() -> Result<T, ProtocolError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProtocolError::WorkerFailed(e.to_string()))?
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

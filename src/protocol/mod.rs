// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seam to the device communication library.
//!
//! The local key-value protocol itself (framing, encryption, sequence numbers)
//! is provided by an external library. This module defines the two traits the
//! manager needs from it:
//!
//! - [`Connector`]: opens a persistent socket to a device
//! - [`DeviceHandle`]: one open connection, used for probe/read/write
//!
//! Both are **blocking**. The manager never calls them on the async executor;
//! every call is moved to a worker thread with `tokio::task::spawn_blocking`.
//!
//! # Implementing a connector
//!
//! ```
//! use humea_lib::DeviceIdentity;
//! use humea_lib::error::ProtocolError;
//! use humea_lib::protocol::{Connector, DeviceHandle, SocketOptions};
//!
//! struct Offline;
//!
//! impl Connector for Offline {
//!     fn open(
//!         &self,
//!         identity: &DeviceIdentity,
//!         _options: &SocketOptions,
//!     ) -> Result<Box<dyn DeviceHandle>, ProtocolError> {
//!         Err(ProtocolError::ConnectionFailed(format!(
//!             "{} is unreachable",
//!             identity.address()
//!         )))
//!     }
//! }
//! ```

use serde_json::Value;

use crate::error::ProtocolError;
use crate::identity::DeviceIdentity;
use crate::types::DpValue;

/// Socket options applied when a connection is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Keep the socket open between exchanges.
    pub persistent: bool,
    /// Disable small-packet coalescing (`TCP_NODELAY`).
    pub no_delay: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            persistent: true,
            no_delay: true,
        }
    }
}

/// Opens connections to a device.
///
/// Implementations wrap the device communication library. `open` is called
/// from a worker thread and may block.
pub trait Connector: Send + Sync {
    /// Opens a connection using the identity's address and credentials.
    ///
    /// The returned handle must already honour `options`. The manager probes
    /// it immediately afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the socket cannot be opened.
    fn open(
        &self,
        identity: &DeviceIdentity,
        options: &SocketOptions,
    ) -> Result<Box<dyn DeviceHandle>, ProtocolError>;
}

/// An open, stateful connection to a device.
///
/// All methods may block. The manager serializes access to a handle, so
/// implementations need not be `Sync`.
pub trait DeviceHandle: Send {
    /// Sends a lightweight liveness probe (heartbeat).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the device does not answer.
    fn probe(&mut self) -> Result<(), ProtocolError>;

    /// Reads the full device state.
    ///
    /// The payload is returned as the library produced it; it may be a direct
    /// data point mapping, a wrapped envelope, or an error object.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` on transport failure.
    fn read_state(&mut self) -> Result<Value, ProtocolError>;

    /// Writes one data point value and returns the raw device reply.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` on transport failure.
    fn write_value(&mut self, dp: &str, value: &DpValue) -> Result<Value, ProtocolError>;

    /// Closes the connection. Errors while closing are not reported.
    fn close(&mut self);
}

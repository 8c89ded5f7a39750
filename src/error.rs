// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `humea_lib` library.
//!
//! This module provides the error hierarchy used across the library: value
//! validation, exchanges with the device, payload parsing, and device
//! configuration.

use thiserror::Error;

/// Top-level error of the library.
#[derive(Debug, Error)]
pub enum Error {
    /// A value failed validation.
    #[error("invalid value: {0}")]
    Value(#[from] ValueError),

    /// An exchange with the device failed.
    #[error("exchange failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// A device payload could not be decoded.
    #[error("bad payload: {0}")]
    Parse(#[from] ParseError),

    /// The device configuration cannot be used.
    #[error("device: {0}")]
    Device(#[from] DeviceError),
}

/// Invalid values and ranges.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A number outside its bounds.
    #[error("{actual} is outside [{min}, {max}]")]
    OutOfRange {
        /// Lower bound.
        min: u16,
        /// Upper bound.
        max: u16,
        /// Rejected value.
        actual: u16,
    },

    /// A range whose minimum exceeds its maximum.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Requested minimum.
        min: u8,
        /// Requested maximum.
        max: u8,
    },

    /// A protocol version string that is not `major.minor`.
    #[error("invalid protocol version: {0}")]
    InvalidProtocolVersion(String),

    /// An unknown fan speed option.
    #[error("invalid fan speed: {0}")]
    InvalidFanSpeed(String),
}

/// Failures of an exchange with the device.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The socket could not be opened or probed.
    #[error("cannot connect: {0}")]
    ConnectionFailed(String),

    /// The exchange ran past its deadline.
    #[error("no answer within {0} ms")]
    Timeout(u64),

    /// Socket-level failure reported by the device library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No connection handle is currently held.
    #[error("no open connection")]
    NotConnected,

    /// The device refused the exchange (key mismatch class errors).
    #[error("request rejected by device: {0}")]
    Rejected(String),

    /// The worker thread running a blocking call failed.
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

impl ProtocolError {
    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true if the device explicitly refused the exchange.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Payloads that do not decode into a status.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Invalid JSON or JSON of the wrong shape.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A required key is absent.
    #[error("payload has no {0}")]
    MissingField(String),

    /// The payload is not shaped as expected.
    #[error("unexpected payload: {0}")]
    UnexpectedFormat(String),
}

/// Unusable device configuration.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The configuration cannot be used.
    #[error("bad configuration: {0}")]
    InvalidConfiguration(String),
}

/// `Result` with this library's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

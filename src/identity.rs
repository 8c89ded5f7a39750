// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity and credentials.

use std::fmt;

use crate::types::ProtocolVersion;

/// Immutable identity of one physical device.
///
/// Holds everything needed to open a connection: device id, network address,
/// protocol version, and the shared secret (local key). The secret is never
/// printed by `Debug`.
///
/// # Examples
///
/// ```
/// use humea_lib::DeviceIdentity;
/// use humea_lib::types::ProtocolVersion;
///
/// let identity = DeviceIdentity::new("dev1", "1.2.3.4", ProtocolVersion::DEFAULT, "secret");
/// assert_eq!(identity.device_id(), "dev1");
/// assert!(!format!("{identity:?}").contains("secret"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    device_id: String,
    address: String,
    version: ProtocolVersion,
    local_key: String,
}

impl DeviceIdentity {
    /// Creates a device identity.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        address: impl Into<String>,
        version: ProtocolVersion,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            address: address.into(),
            version,
            local_key: local_key.into(),
        }
    }

    /// Returns the device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the network address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the protocol version.
    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the shared secret.
    #[must_use]
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    /// Returns the registry key for this identity (device id + address).
    #[must_use]
    pub fn registry_key(&self) -> RegistryKey {
        RegistryKey {
            device_id: self.device_id.clone(),
            address: self.address.clone(),
        }
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("address", &self.address)
            .field("version", &self.version)
            .field("local_key", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.device_id, self.address)
    }
}

/// Key identifying one physical device in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    device_id: String,
    address: String,
}

impl RegistryKey {
    /// Creates a registry key.
    #[must_use]
    pub fn new(device_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            address: address.into(),
        }
    }

    /// Returns the device id part.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the address part.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.device_id, self.address)
    }
}

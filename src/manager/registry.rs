// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of device managers.
//!
//! The registry keeps at most one [`DeviceManager`] per device (identified by
//! device id and address), so every consumer of a device shares one
//! connection.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::identity::RegistryKey;
use crate::protocol::Connector;

use super::device_config::{DeviceConfig, ManagerConfig};
use super::device_manager::DeviceManager;

/// Shared table of device managers.
///
/// Lookup and insertion happen under one lock, so concurrent first-time
/// lookups of the same device yield the same manager.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use humea_lib::manager::{DeviceConfig, ManagerRegistry};
/// # use humea_lib::DeviceIdentity;
/// # use humea_lib::error::ProtocolError;
/// # use humea_lib::protocol::{Connector, DeviceHandle, SocketOptions};
/// # struct Offline;
/// # impl Connector for Offline {
/// #     fn open(&self, _: &DeviceIdentity, _: &SocketOptions)
/// #         -> Result<Box<dyn DeviceHandle>, ProtocolError> {
/// #         Err(ProtocolError::NotConnected)
/// #     }
/// # }
///
/// # fn main() -> humea_lib::Result<()> {
/// let registry = ManagerRegistry::new();
/// let config = DeviceConfig::new("bf1234", "0123456789abcdef", "192.168.1.40");
///
/// let first = registry.get_or_create(&config, Arc::new(Offline))?;
/// let second = registry.get_or_create(&config, Arc::new(Offline))?;
/// assert!(Arc::ptr_eq(&first, &second));
/// assert_eq!(registry.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ManagerRegistry {
    managers: Mutex<HashMap<RegistryKey, Arc<DeviceManager>>>,
}

impl ManagerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the manager for `config`, creating it with the default policy.
    ///
    /// `connector` is only used when the manager is created.
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if the configuration is invalid.
    pub fn get_or_create(
        &self,
        config: &DeviceConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Arc<DeviceManager>, Error> {
        self.get_or_create_with(config, connector, ManagerConfig::default())
    }

    /// Returns the manager for `config`, creating it with `manager_config`.
    ///
    /// An existing manager keeps the policy it was created with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if the configuration is invalid.
    pub fn get_or_create_with(
        &self,
        config: &DeviceConfig,
        connector: Arc<dyn Connector>,
        manager_config: ManagerConfig,
    ) -> Result<Arc<DeviceManager>, Error> {
        config.validate()?;
        let key = config.identity().registry_key();

        let mut managers = self.managers.lock();
        if let Some(manager) = managers.get(&key) {
            tracing::debug!(key = %key, "Reusing device manager");
            return Ok(Arc::clone(manager));
        }

        let manager = Arc::new(DeviceManager::with_config(
            config,
            connector,
            manager_config,
        )?);
        managers.insert(key.clone(), Arc::clone(&manager));
        tracing::info!(key = %key, "Device manager registered");
        Ok(manager)
    }

    /// Returns the manager registered under `key`.
    #[must_use]
    pub fn get(&self, key: &RegistryKey) -> Option<Arc<DeviceManager>> {
        self.managers.lock().get(key).cloned()
    }

    /// Returns true if a manager is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.managers.lock().contains_key(key)
    }

    /// Returns the keys of all registered managers.
    #[must_use]
    pub fn keys(&self) -> Vec<RegistryKey> {
        self.managers.lock().keys().cloned().collect()
    }

    /// Returns the number of registered managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.lock().len()
    }

    /// Returns true if no manager is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.lock().is_empty()
    }

    /// Removes the manager under `key` and closes its connection.
    ///
    /// Returns false if no manager was registered. Holders of the removed
    /// manager may keep using it; it reconnects on their next operation.
    pub async fn remove(&self, key: &RegistryKey) -> bool {
        let removed = self.managers.lock().remove(key);
        let Some(manager) = removed else {
            return false;
        };

        if let Err(e) = manager.disconnect().await {
            tracing::warn!(key = %key, error = %e, "Disconnect on removal failed");
        }
        tracing::info!(key = %key, "Device manager removed");
        true
    }

    /// Removes every manager and closes its connection.
    pub async fn shutdown_all(&self) {
        let drained: Vec<_> = self.managers.lock().drain().collect();

        for (key, manager) in drained {
            if let Err(e) = manager.disconnect().await {
                tracing::warn!(key = %key, error = %e, "Disconnect on shutdown failed");
            }
        }
        tracing::info!("All device managers shut down");
    }
}

impl std::fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("managers", &self.len())
            .finish()
    }
}

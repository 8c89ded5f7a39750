// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot cache with fetch throttling.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::response::DeviceStatus;

/// Result of consulting the cache before a read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CacheLookup {
    /// Snapshot is within the validity window.
    Fresh(DeviceStatus),
    /// Too soon after the previous fetch; serve what we have.
    Throttled(DeviceStatus),
    /// Another caller is already fetching.
    InFlight(DeviceStatus),
    /// A fetch should run; the caller now owns the in-flight flag.
    Fetch,
}

/// Last known-good state of one device.
#[derive(Debug)]
pub(crate) struct FreshnessCache {
    snapshot: Option<DeviceStatus>,
    fetched_at: Option<Instant>,
    last_complete: Option<DeviceStatus>,
    fetching: bool,
    validity_window: Duration,
    min_fetch_interval: Duration,
    complete_threshold: usize,
}

impl FreshnessCache {
    pub fn new(
        validity_window: Duration,
        min_fetch_interval: Duration,
        complete_threshold: usize,
    ) -> Self {
        Self {
            snapshot: None,
            fetched_at: None,
            last_complete: None,
            fetching: false,
            validity_window,
            min_fetch_interval,
            complete_threshold,
        }
    }

    /// Applies the read policy and claims the in-flight flag on `Fetch`.
    pub fn begin_fetch(&mut self, now: Instant) -> CacheLookup {
        let age = self.fetched_at.map(|at| now.saturating_duration_since(at));

        if let (Some(snapshot), Some(age)) = (&self.snapshot, age)
            && age < self.validity_window
        {
            tracing::debug!(age = ?age, dps = snapshot.len(), "Cache hit");
            return CacheLookup::Fresh(snapshot.clone());
        }

        if let Some(age) = age
            && age < self.min_fetch_interval
        {
            tracing::debug!(age = ?age, "Minimum fetch interval not met");
            return CacheLookup::Throttled(self.cached_or_empty());
        }

        if self.fetching {
            tracing::debug!("Already fetching");
            return CacheLookup::InFlight(self.cached_or_empty());
        }

        self.fetching = true;
        CacheLookup::Fetch
    }

    /// Releases the in-flight flag.
    pub fn end_fetch(&mut self) {
        self.fetching = false;
    }

    #[cfg(test)]
    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// Stores a successful fetch and returns the snapshot to serve.
    ///
    /// A fetch with more points than the completeness threshold becomes the
    /// new complete snapshot. A thinner one is served as the last complete
    /// snapshot instead, when there is one.
    pub fn store(&mut self, status: DeviceStatus, now: Instant) -> DeviceStatus {
        let count = status.len();
        let served = if count > self.complete_threshold {
            tracing::info!(dps = count, "Status fresh, complete response");
            self.last_complete = Some(status.clone());
            status
        } else if let Some(complete) = &self.last_complete {
            tracing::warn!(
                dps = count,
                complete_dps = complete.len(),
                "Status incomplete, using last complete response"
            );
            complete.clone()
        } else {
            tracing::warn!(dps = count, "Status incomplete, no complete response yet");
            status
        };

        self.snapshot = Some(served.clone());
        self.fetched_at = Some(now);
        served
    }

    /// Forces the next read to fetch.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Returns the cached snapshot, or an empty status.
    pub fn cached_or_empty(&self) -> DeviceStatus {
        self.snapshot.clone().unwrap_or_default()
    }

    /// Returns the last complete snapshot, else the cached one, else empty.
    pub fn fallback(&self) -> DeviceStatus {
        match &self.last_complete {
            Some(complete) => {
                tracing::warn!(dps = complete.len(), "Using last complete response");
                complete.clone()
            }
            None => self.cached_or_empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot.as_ref().map_or(0, DeviceStatus::len)
    }
}

/// Holds the in-flight flag for the duration of one fetch.
///
/// The flag is released on drop, including when the fetching future is
/// cancelled by an outer deadline.
pub(crate) struct FetchGuard<'a> {
    cache: &'a Mutex<FreshnessCache>,
}

impl<'a> FetchGuard<'a> {
    /// Wraps a flag already claimed through [`FreshnessCache::begin_fetch`].
    pub fn claimed(cache: &'a Mutex<FreshnessCache>) -> Self {
        Self { cache }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock().end_fetch();
    }
}

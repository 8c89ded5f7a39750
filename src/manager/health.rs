// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Failure counters and reconnect policy.

use chrono::{DateTime, Utc};

/// Snapshot of the failure counters of a manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCounters {
    /// Protocol rejections since the last non-rejection exchange.
    pub protocol_rejections: u32,
    /// Timeouts since the last successful exchange.
    pub timeouts: u32,
    /// Timeouts and transport failures since the last successful exchange.
    pub consecutive_failures: u32,
}

impl HealthCounters {
    /// Returns true if every counter is zero.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

/// What the tracker asks the caller to do after recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Carry on.
    Continue,
    /// A threshold was reached; the connection should be rebuilt.
    Reconnect,
}

/// Counts exchange outcomes and decides when a reconnect is warranted.
#[derive(Debug)]
pub(crate) struct HealthTracker {
    counters: HealthCounters,
    rejection_threshold: u32,
    failure_threshold: u32,
    reconnects: u64,
    last_success_at: Option<DateTime<Utc>>,
    last_reconnect_at: Option<DateTime<Utc>>,
}

impl HealthTracker {
    pub fn new(rejection_threshold: u32, failure_threshold: u32) -> Self {
        Self {
            counters: HealthCounters::default(),
            rejection_threshold,
            failure_threshold,
            reconnects: 0,
            last_success_at: None,
            last_reconnect_at: None,
        }
    }

    pub fn counters(&self) -> HealthCounters {
        self.counters
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }

    pub fn last_reconnect_at(&self) -> Option<DateTime<Utc>> {
        self.last_reconnect_at
    }

    /// A fully successful exchange clears every counter.
    pub fn record_success(&mut self) {
        self.counters = HealthCounters::default();
        self.last_success_at = Some(Utc::now());
    }

    /// The device refused the exchange.
    pub fn record_rejection(&mut self) -> Verdict {
        self.counters.protocol_rejections += 1;
        if self.counters.protocol_rejections >= self.rejection_threshold {
            Verdict::Reconnect
        } else {
            Verdict::Continue
        }
    }

    /// The device answered with something that could not be normalized.
    pub fn record_invalid(&mut self) {
        self.counters.protocol_rejections = 0;
    }

    /// The exchange ran past its deadline.
    pub fn record_timeout(&mut self) -> Verdict {
        self.counters.timeouts += 1;
        self.record_failure()
    }

    /// The exchange failed for any other reason.
    pub fn record_failure(&mut self) -> Verdict {
        self.counters.protocol_rejections = 0;
        self.counters.consecutive_failures += 1;
        if self.counters.consecutive_failures >= self.failure_threshold {
            // Reset on trigger regardless of whether the reconnect succeeds.
            self.counters.consecutive_failures = 0;
            Verdict::Reconnect
        } else {
            Verdict::Continue
        }
    }

    /// A reconnect was attempted.
    pub fn record_reconnect(&mut self, succeeded: bool) {
        self.reconnects += 1;
        self.last_reconnect_at = Some(Utc::now());
        if succeeded {
            self.counters = HealthCounters::default();
        }
    }
}

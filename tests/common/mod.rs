// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory device shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use humea_lib::error::ProtocolError;
use humea_lib::manager::{DeviceConfig, ManagerConfig};
use humea_lib::protocol::{Connector, DeviceHandle, SocketOptions};
use humea_lib::{DeviceIdentity, DpValue};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// One scripted device answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with this payload.
    Payload(Value),
    /// Fail with a transport error.
    Fail(&'static str),
    /// Fail with a protocol rejection raised by the library.
    Reject(&'static str),
    /// Block the worker thread, then answer with the payload.
    Slow(Duration, Value),
}

impl Reply {
    fn resolve(self) -> Result<Value, ProtocolError> {
        match self {
            Self::Payload(value) => Ok(value),
            Self::Fail(message) => Err(ProtocolError::ConnectionFailed(message.to_string())),
            Self::Reject(message) => Err(ProtocolError::Rejected(message.to_string())),
            Self::Slow(delay, value) => {
                std::thread::sleep(delay);
                Ok(value)
            }
        }
    }
}

#[derive(Default)]
struct Script {
    reads: VecDeque<Reply>,
    default_read: Option<Reply>,
    writes: VecDeque<Reply>,
    open_failures: usize,
    open_delay: Duration,
    written: Vec<(String, DpValue)>,
}

#[derive(Default)]
struct Inner {
    script: Mutex<Script>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    probes: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

/// A fake humidifier with scripted replies and exchange counters.
///
/// Reads pop the next queued reply, then fall back to the default reply, then
/// to an empty `dps` mapping. Writes echo the written point unless a reply is
/// queued.
#[derive(Clone, Default)]
pub struct MockDevice {
    inner: Arc<Inner>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a connector opening handles to this device.
    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(MockConnector {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn push_read(&self, reply: Reply) -> &Self {
        self.inner.script.lock().reads.push_back(reply);
        self
    }

    pub fn push_payload(&self, payload: Value) -> &Self {
        self.push_read(Reply::Payload(payload))
    }

    pub fn set_default_read(&self, reply: Reply) {
        self.inner.script.lock().default_read = Some(reply);
    }

    pub fn push_write(&self, reply: Reply) -> &Self {
        self.inner.script.lock().writes.push_back(reply);
        self
    }

    /// Makes the next `count` connection attempts fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.script.lock().open_failures = count;
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.inner.script.lock().open_delay = delay;
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.inner.probes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Returns every data point written so far.
    pub fn written(&self) -> Vec<(String, DpValue)> {
        self.inner.script.lock().written.clone()
    }
}

struct MockConnector {
    inner: Arc<Inner>,
}

impl Connector for MockConnector {
    fn open(
        &self,
        _identity: &DeviceIdentity,
        options: &SocketOptions,
    ) -> Result<Box<dyn DeviceHandle>, ProtocolError> {
        assert!(options.persistent && options.no_delay);

        let delay = self.inner.script.lock().open_delay;
        std::thread::sleep(delay);
        self.inner.opens.fetch_add(1, Ordering::SeqCst);

        let mut script = self.inner.script.lock();
        if script.open_failures > 0 {
            script.open_failures -= 1;
            return Err(ProtocolError::ConnectionFailed("host unreachable".into()));
        }

        Ok(Box::new(MockHandle {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockHandle {
    inner: Arc<Inner>,
}

impl DeviceHandle for MockHandle {
    fn probe(&mut self) -> Result<(), ProtocolError> {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_state(&mut self) -> Result<Value, ProtocolError> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let mut script = self.inner.script.lock();
            script
                .reads
                .pop_front()
                .or_else(|| script.default_read.clone())
                .unwrap_or_else(|| Reply::Payload(json!({"dps": {}})))
        };
        reply.resolve()
    }

    fn write_value(&mut self, dp: &str, value: &DpValue) -> Result<Value, ProtocolError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let mut script = self.inner.script.lock();
            script.written.push((dp.to_string(), value.clone()));
            script.writes.pop_front()
        };
        match reply {
            Some(reply) => reply.resolve(),
            None => Ok(json!({"dps": {dp: Value::from(value.clone())}})),
        }
    }

    fn close(&mut self) {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Configuration of the scripted device.
pub fn device_config() -> DeviceConfig {
    DeviceConfig::new("dev1", "0123456789abcdef", "1.2.3.4")
}

/// Policy that fetches on every read and retries quickly.
pub fn uncached() -> ManagerConfig {
    ManagerConfig::new()
        .with_validity_window(Duration::ZERO)
        .with_min_fetch_interval(Duration::ZERO)
        .with_retry_delay(Duration::from_millis(10))
        .with_invalid_backoff(Duration::from_millis(10))
        .with_status_timeout(Duration::from_secs(2))
        .with_set_timeout(Duration::from_secs(2))
}

/// Installs a test subscriber; repeated calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

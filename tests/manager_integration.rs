// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the device manager using a scripted device.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockDevice, Reply, device_config, init_tracing, uncached};
use humea_lib::error::{Error, ProtocolError};
use humea_lib::manager::{DeviceManager, ManagerConfig};
use humea_lib::response::{DeviceStatus, HumidifierState};
use humea_lib::types::{DpValue, FanSpeed, TargetHumidity};
use serde_json::{Value, json};

fn manager(device: &MockDevice, config: ManagerConfig) -> DeviceManager {
    init_tracing();
    DeviceManager::with_config(&device_config(), device.connector(), config).unwrap()
}

fn status(value: Value) -> DeviceStatus {
    serde_json::from_value(value).unwrap()
}

fn rejection() -> Value {
    json!({"Err": "914", "Error": "Check device key or version"})
}

// ============================================================================
// Read path
// ============================================================================

mod read_path {
    use super::*;

    #[tokio::test]
    async fn end_to_end_read_then_rejections() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        let first = manager.get_status().await;
        assert_eq!(first.to_json(), json!({"dps": {"1": true, "14": "55"}}));
        assert!(manager.counters().is_clear());

        device.push_payload(rejection()).push_payload(rejection());

        let second = manager.get_status().await;
        assert_eq!(second, first);
        assert_eq!(manager.counters().protocol_rejections, 1);
        assert_eq!(device.opens(), 1);

        let third = manager.get_status().await;
        assert_eq!(third, first);
        assert_eq!(device.opens(), 2);
        assert_eq!(manager.stats().reconnects, 1);
        assert!(manager.counters().is_clear());
        assert_eq!(device.reads(), 3);
    }

    #[tokio::test]
    async fn library_rejection_error_counts_as_rejection() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_read(Reply::Reject("key mismatch"));
        let result = manager.get_status().await;

        assert!(result.is_empty());
        assert_eq!(manager.counters().protocol_rejections, 1);
        assert_eq!(manager.counters().consecutive_failures, 0);
        assert_eq!(device.reads(), 1);
    }

    #[tokio::test]
    async fn reads_within_validity_window_hit_cache() {
        let device = MockDevice::new();
        let manager = manager(&device, ManagerConfig::default());

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        device.push_payload(json!({"dps": {"1": false, "14": "40"}}));

        let first = manager.get_status().await;
        let second = manager.get_status().await;

        assert_eq!(first, second);
        assert_eq!(device.reads(), 1);
    }

    #[tokio::test]
    async fn stale_reads_inside_min_interval_are_throttled() {
        let device = MockDevice::new();
        let config = ManagerConfig::new()
            .with_validity_window(Duration::ZERO)
            .with_min_fetch_interval(Duration::from_secs(5));
        let manager = manager(&device, config);

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        device.push_payload(json!({"dps": {"1": false, "14": "40"}}));

        let first = manager.get_status().await;
        let second = manager.get_status().await;

        assert_eq!(first, second);
        assert_eq!(device.reads(), 1);
    }

    #[tokio::test]
    async fn thin_fetch_is_replaced_by_last_complete_snapshot() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        let complete = json!({"dps": {"1": true, "14": "55", "101": "60RH"}});
        device.push_payload(complete.clone());
        device.push_payload(json!({"dps": {"14": "56"}}));

        manager.get_status().await;
        let served = manager.get_status().await;

        assert_eq!(served, status(complete));
        assert!(manager.counters().is_clear());
        assert!(manager.stats().last_success_at.is_some());
    }

    #[tokio::test]
    async fn wrapped_payload_is_unwrapped() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_payload(json!({
            "protocol": 4,
            "t": 1_700_000_000,
            "data": {"dps": {"1": true, "101": "55RH", "103": "High_speed"}}
        }));

        let result = manager.get_status().await;
        assert_eq!(result.len(), 3);

        let state = HumidifierState::from_status(&result);
        assert_eq!(state.power, Some(true));
        assert_eq!(state.target_humidity.map(|t| t.value()), Some(55));
        assert_eq!(state.fan_speed, Some(FanSpeed::High));
    }

    #[tokio::test]
    async fn invalid_payload_is_retried_once() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_payload(json!("busy"));
        device.push_payload(json!({"dps": {"1": true, "14": "50"}}));

        let result = manager.get_status().await;
        assert_eq!(result.len(), 2);
        assert_eq!(device.reads(), 2);
    }

    #[tokio::test]
    async fn repeated_invalid_payload_falls_back_to_last_complete() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        let complete = json!({"dps": {"1": true, "14": "55", "16": false}});
        device.push_payload(complete.clone());
        manager.get_status().await;

        device.push_payload(json!(["not", "a", "mapping"]));
        device.push_payload(json!({"devId": "dev1"}));

        let result = manager.get_status().await;
        assert_eq!(result, status(complete));
        assert_eq!(device.reads(), 3);
        assert_eq!(manager.counters().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn nothing_known_degrades_to_empty() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached().with_read_attempts(1));

        device.push_read(Reply::Fail("connection reset"));

        let result = manager.get_status().await;
        assert!(result.is_empty());
        assert_eq!(result.to_json(), json!({"dps": {}}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fetch_serves_cached_snapshot() {
        let device = MockDevice::new();
        let manager = Arc::new(manager(&device, uncached()));

        let cached = json!({"dps": {"1": true, "14": "55"}});
        device.push_payload(cached.clone());
        manager.get_status().await;

        let fresh = json!({"dps": {"1": true, "14": "60"}});
        device.push_read(Reply::Slow(Duration::from_millis(300), fresh.clone()));

        let slow = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.get_status().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let during = manager.get_status().await;
        assert_eq!(during, status(cached));

        let after = slow.await.unwrap();
        assert_eq!(after, status(fresh));
        assert_eq!(device.reads(), 2);
    }
}

// ============================================================================
// Connection lifecycle and health
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_reads_open_one_connection() {
        let device = MockDevice::new();
        device.set_open_delay(Duration::from_millis(100));
        device.set_default_read(Reply::Payload(json!({"dps": {"1": true, "14": "55"}})));
        let manager = Arc::new(manager(&device, ManagerConfig::default()));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_status().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(device.opens(), 1);
        assert_eq!(device.reads(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn three_consecutive_failures_reconnect_once() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached().with_read_attempts(1));

        for _ in 0..3 {
            device.push_read(Reply::Fail("connection reset"));
        }

        manager.get_status().await;
        manager.get_status().await;
        assert_eq!(manager.counters().consecutive_failures, 2);
        assert_eq!(device.opens(), 1);

        manager.get_status().await;
        assert_eq!(device.opens(), 2);
        assert_eq!(device.closes(), 1);
        assert_eq!(manager.counters().consecutive_failures, 0);
        assert_eq!(manager.stats().reconnects, 1);
    }

    #[tokio::test]
    async fn failures_within_one_read_use_every_attempt() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_read(Reply::Fail("connection reset"));
        device.push_read(Reply::Fail("connection reset"));

        assert!(manager.get_status().await.is_empty());
        assert_eq!(device.reads(), 2);
        assert_eq!(manager.counters().consecutive_failures, 2);
    }

    #[tokio::test]
    async fn timeout_counts_and_recovers() {
        let device = MockDevice::new();
        let config = uncached()
            .with_read_attempts(1)
            .with_status_timeout(Duration::from_millis(50));
        let manager = manager(&device, config);

        device.push_read(Reply::Slow(
            Duration::from_millis(200),
            json!({"dps": {"1": true}}),
        ));
        assert!(manager.get_status().await.is_empty());

        let counters = manager.counters();
        assert_eq!(counters.timeouts, 1);
        assert_eq!(counters.consecutive_failures, 1);

        // let the abandoned worker release the handle
        tokio::time::sleep(Duration::from_millis(300)).await;

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        assert_eq!(manager.get_status().await.len(), 2);
        assert!(manager.counters().is_clear());
        assert_eq!(device.opens(), 1);
    }

    #[tokio::test]
    async fn failed_initial_connection_is_retried_on_next_call() {
        let device = MockDevice::new();
        device.fail_next_opens(1);
        let manager = manager(&device, uncached());

        assert!(manager.get_status().await.is_empty());
        assert!(!manager.is_connected());
        assert_eq!(manager.counters().consecutive_failures, 1);
        assert_eq!(device.reads(), 0);

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        assert_eq!(manager.get_status().await.len(), 2);
        assert!(manager.is_connected());
        assert_eq!(device.opens(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shared_failed_connect_counts_once() {
        let device = MockDevice::new();
        device.fail_next_opens(1);
        device.set_open_delay(Duration::from_millis(100));
        let manager = Arc::new(manager(&device, uncached()));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_status().await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_empty());
        }

        assert_eq!(device.opens(), 1);
        assert_eq!(manager.stats().reconnects, 0);
        assert_eq!(manager.counters().consecutive_failures, 1);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn disconnect_gives_up_on_wedged_handle() {
        let device = MockDevice::new();
        let config = uncached()
            .with_read_attempts(1)
            .with_status_timeout(Duration::from_millis(50))
            .with_connect_timeout(Duration::from_millis(100));
        let manager = manager(&device, config);

        device.push_read(Reply::Slow(
            Duration::from_millis(600),
            json!({"dps": {"1": true}}),
        ));
        manager.get_status().await;
        assert_eq!(manager.counters().timeouts, 1);

        // the abandoned worker still holds the handle
        let result = tokio::time::timeout(Duration::from_millis(400), manager.disconnect())
            .await
            .expect("disconnect is bounded");

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::Timeout(100)))
        ));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn manual_reconnect_clears_counters() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached().with_read_attempts(1));

        device.push_read(Reply::Fail("connection reset"));
        manager.get_status().await;
        assert_eq!(manager.counters().consecutive_failures, 1);

        manager.reconnect().await.unwrap();

        let stats = manager.stats();
        assert!(stats.counters.is_clear());
        assert_eq!(stats.reconnects, 1);
        assert!(stats.last_reconnect_at.is_some());
        assert!(stats.connected);
        assert_eq!(device.opens(), 2);
        assert_eq!(device.closes(), 1);
    }

    #[tokio::test]
    async fn failed_reconnect_is_reported() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());
        manager.get_status().await;

        device.fail_next_opens(1);
        let result = manager.reconnect().await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::ConnectionFailed(_)))
        ));
        assert!(!manager.is_connected());
        assert_eq!(manager.stats().reconnects, 1);
    }

    #[tokio::test]
    async fn disconnect_closes_and_next_read_reconnects() {
        let device = MockDevice::new();
        device.set_default_read(Reply::Payload(json!({"dps": {"1": true, "14": "55"}})));
        let manager = manager(&device, uncached());

        manager.get_status().await;
        manager.disconnect().await.unwrap();
        assert!(!manager.is_connected());
        assert_eq!(device.closes(), 1);

        assert_eq!(manager.get_status().await.len(), 2);
        assert_eq!(device.opens(), 2);
    }

    #[tokio::test]
    async fn keep_alive_probes_device() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());
        manager.get_status().await;
        assert_eq!(device.probes(), 1);

        assert!(manager.send_keep_alive().await);
        assert_eq!(device.probes(), 2);
    }
}

// ============================================================================
// Write path
// ============================================================================

mod write_path {
    use super::*;

    #[tokio::test]
    async fn successful_write_invalidates_cache() {
        let device = MockDevice::new();
        let manager = manager(&device, ManagerConfig::default());

        device.push_payload(json!({"dps": {"1": true, "14": "55"}}));
        manager.get_status().await;

        assert!(manager.set_value("1", false).await);
        assert_eq!(
            device.written(),
            vec![("1".to_string(), DpValue::Bool(false))]
        );

        device.push_payload(json!({"dps": {"1": false, "14": "55"}}));
        let after = manager.get_status().await;

        assert_eq!(after.get("1"), Some(&DpValue::Bool(false)));
        assert_eq!(device.reads(), 2);
    }

    #[tokio::test]
    async fn failed_write_returns_false_without_retry() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_write(Reply::Fail("broken pipe"));

        assert!(!manager.set_power(true).await);
        assert_eq!(device.writes(), 1);
        assert_eq!(manager.counters().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn rejected_write_reports_rejection() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        device.push_write(Reply::Payload(rejection()));
        let result = manager.try_set_value("16", true).await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::Rejected(_)))
        ));
        assert_eq!(manager.counters().protocol_rejections, 1);

        device.push_write(Reply::Reject("key mismatch"));
        assert!(!manager.set_night_mode(true).await);

        // second rejection reconnects, which clears counters
        assert_eq!(device.opens(), 2);
        assert!(manager.counters().is_clear());
    }

    #[tokio::test]
    async fn write_sends_keep_alive_when_due() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        assert!(manager.set_power(true).await);
        // connection probe plus keep-alive
        assert_eq!(device.probes(), 2);

        assert!(manager.set_power(false).await);
        assert_eq!(device.probes(), 2);
    }

    #[tokio::test]
    async fn convenience_writes_use_wire_values() {
        let device = MockDevice::new();
        let manager = manager(&device, uncached());

        assert!(manager.set_target_humidity(TargetHumidity::new(90).unwrap()).await);
        assert!(manager.set_target_humidity(TargetHumidity::new(20).unwrap()).await);
        assert!(manager.set_fan_speed(FanSpeed::Turbo).await);
        assert!(manager.set_constant_mode(false).await);

        assert_eq!(
            device.written(),
            vec![
                ("101".to_string(), DpValue::from("75RH")),
                ("101".to_string(), DpValue::from("40RH")),
                ("103".to_string(), DpValue::from("Turbo_speed")),
                ("19".to_string(), DpValue::Bool(false)),
            ]
        );
    }

    #[tokio::test]
    async fn write_on_unreachable_device_fails() {
        let device = MockDevice::new();
        device.fail_next_opens(1);
        let manager = manager(&device, uncached());

        let result = manager.try_set_value("1", true).await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::ConnectionFailed(_)))
        ));
        assert_eq!(device.writes(), 0);
    }
}

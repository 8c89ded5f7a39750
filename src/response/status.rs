// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical device status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::{DataPoint, DpValue};

/// Canonical device state: a `dps` mapping from data point key to value.
///
/// Only the normalizer produces this type from raw payloads, so every
/// snapshot held by the manager has this shape. Any other top-level fields of
/// a direct payload (device id, timestamps) are preserved in [`extra`].
///
/// [`extra`]: DeviceStatus::extra
///
/// # Examples
///
/// ```
/// use humea_lib::response::DeviceStatus;
/// use humea_lib::types::DataPoint;
///
/// let status: DeviceStatus =
///     serde_json::from_str(r#"{"dps":{"1":true,"14":"55"}}"#).unwrap();
/// assert_eq!(status.len(), 2);
/// assert_eq!(status.point(DataPoint::Power).and_then(|v| v.as_bool()), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    dps: BTreeMap<String, DpValue>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl DeviceStatus {
    /// Creates an empty status (no data points).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a status from data point pairs.
    #[must_use]
    pub fn from_points<K, V>(points: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<DpValue>,
    {
        Self {
            dps: points
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            extra: Map::new(),
        }
    }

    /// Returns the data point mapping.
    #[must_use]
    pub fn dps(&self) -> &BTreeMap<String, DpValue> {
        &self.dps
    }

    /// Returns the value for a raw key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DpValue> {
        self.dps.get(key)
    }

    /// Returns the value for a known data point.
    #[must_use]
    pub fn point(&self, dp: DataPoint) -> Option<&DpValue> {
        self.dps.get(dp.key())
    }

    /// Returns the number of data points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dps.len()
    }

    /// Returns true if there are no data points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dps.is_empty()
    }

    /// Returns top-level fields other than `dps`.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Converts the status back to JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut obj = self.extra.clone();
        let dps: Map<String, Value> = self
            .dps
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        obj.insert("dps".to_string(), Value::Object(dps));
        Value::Object(obj)
    }
}

impl TryFrom<Map<String, Value>> for DeviceStatus {
    type Error = ParseError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        match map.get("dps") {
            None => return Err(ParseError::MissingField("dps".to_string())),
            Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(ParseError::UnexpectedFormat(format!(
                    "dps is not a mapping: {other}"
                )));
            }
        }
        serde_json::from_value(Value::Object(map)).map_err(ParseError::Json)
    }
}

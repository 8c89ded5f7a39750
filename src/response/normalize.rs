// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalization of raw state payloads.
//!
//! The device answers the same state query in two shapes:
//!
//! - **Direct**: `{"dps": {...}}`, possibly with other top-level fields
//! - **Wrapped**: `{"protocol": 4, "data": {"dps": {...}}, ...}`
//!
//! [`normalize`] maps both to the canonical `{"dps": {...}}` mapping and tags
//! which shape was seen.

use serde_json::{Map, Value};

const DPS_KEY: &str = "dps";
const PROTOCOL_KEY: &str = "protocol";
const DATA_KEY: &str = "data";

/// Device error code reported when it refuses a request.
pub const REJECTION_CODE: &str = "914";

/// Phrase in the error string when the device rejects the local key.
pub const REJECTION_PHRASE: &str = "Check device key";

/// Outcome of normalizing a raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The payload already had the canonical shape and is returned unchanged.
    Direct(Map<String, Value>),
    /// The payload was an envelope; this is the nested mapping.
    Wrapped(Map<String, Value>),
    /// Envelope markers were ambiguous but a `dps` mapping was present.
    Tolerant(Map<String, Value>),
    /// No data point mapping could be found.
    Rejected,
}

impl Normalized {
    /// Returns the canonical mapping, if any.
    #[must_use]
    pub fn into_canonical(self) -> Option<Map<String, Value>> {
        match self {
            Self::Direct(map) | Self::Wrapped(map) | Self::Tolerant(map) => Some(map),
            Self::Rejected => None,
        }
    }

    /// Returns a short name of the shape, for logging.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Wrapped(_) => "wrapped",
            Self::Tolerant(_) => "tolerant",
            Self::Rejected => "rejected",
        }
    }
}

/// Normalizes a raw state payload.
///
/// # Examples
///
/// ```
/// use humea_lib::response::{Normalized, normalize};
/// use serde_json::json;
///
/// let wrapped = json!({"protocol": 4, "data": {"dps": {"1": true}}, "t": 1});
/// let Normalized::Wrapped(inner) = normalize(&wrapped) else { panic!() };
/// assert_eq!(inner["dps"], json!({"1": true}));
///
/// assert_eq!(normalize(&json!("busy")), Normalized::Rejected);
/// ```
#[must_use]
pub fn normalize(raw: &Value) -> Normalized {
    let Value::Object(obj) = raw else {
        tracing::error!(kind = json_kind(raw), "Response is not a mapping");
        return Normalized::Rejected;
    };

    let has_protocol = obj.contains_key(PROTOCOL_KEY);
    let has_data = obj.contains_key(DATA_KEY);

    if obj.contains_key(DPS_KEY) && !has_protocol && !has_data {
        tracing::debug!(dps = dps_len(obj), "Direct response");
        return Normalized::Direct(obj.clone());
    }

    if has_protocol
        && let Some(Value::Object(inner)) = obj.get(DATA_KEY)
        && inner.contains_key(DPS_KEY)
    {
        tracing::debug!(dps = dps_len(inner), "Wrapped response, unwrapped");
        return Normalized::Wrapped(inner.clone());
    }

    if let Some(Value::Object(dps)) = obj.get(DPS_KEY) {
        tracing::debug!(dps = dps.len(), "Ambiguous envelope, using top-level dps");
        let mut canonical = Map::new();
        canonical.insert(DPS_KEY.to_string(), Value::Object(dps.clone()));
        return Normalized::Tolerant(canonical);
    }

    tracing::error!(payload = %raw, "Cannot normalize response");
    Normalized::Rejected
}

/// Validates a canonical mapping.
///
/// Rejects mappings without `dps` or where `dps` is not a mapping. An empty
/// `dps` is valid but incomplete; callers tell the two apart by point count.
#[must_use]
pub fn validate(canonical: &Map<String, Value>) -> bool {
    match canonical.get(DPS_KEY) {
        None => {
            tracing::error!("No dps in normalized response");
            false
        }
        Some(Value::Object(dps)) => {
            if dps.is_empty() {
                tracing::warn!("dps is empty, device may be busy");
            }
            true
        }
        Some(other) => {
            tracing::error!(kind = json_kind(other), "dps is not a mapping");
            false
        }
    }
}

/// Returns the rejection reason if `raw` is a protocol rejection.
///
/// Detection is best effort: it matches the device error code in `Err`
/// (string or number) or the key rejection phrase inside `Error`.
#[must_use]
pub fn protocol_rejection(raw: &Value) -> Option<String> {
    let Value::Object(obj) = raw else {
        return None;
    };

    let code_matches = match obj.get("Err") {
        Some(Value::String(code)) => code == REJECTION_CODE,
        Some(Value::Number(code)) => code.to_string() == REJECTION_CODE,
        _ => false,
    };
    let message = obj.get("Error").and_then(Value::as_str).unwrap_or_default();

    if code_matches || message.contains(REJECTION_PHRASE) {
        let reason = if message.is_empty() {
            format!("error {REJECTION_CODE}")
        } else {
            message.to_string()
        };
        Some(reason)
    } else {
        None
    }
}

/// Returns true if `raw` is a protocol rejection.
#[must_use]
pub fn is_protocol_rejection(raw: &Value) -> bool {
    protocol_rejection(raw).is_some()
}

fn dps_len(obj: &Map<String, Value>) -> usize {
    obj.get(DPS_KEY)
        .and_then(Value::as_object)
        .map_or(0, Map::len)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

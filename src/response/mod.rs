// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device payload handling.
//!
//! - [`normalize`] / [`validate`]: raw payload to canonical mapping
//! - [`DeviceStatus`]: the canonical `dps` snapshot
//! - [`HumidifierState`]: typed view of a snapshot

mod humidifier;
mod normalize;
mod status;

pub use humidifier::HumidifierState;
pub use normalize::{
    Normalized, REJECTION_CODE, REJECTION_PHRASE, is_protocol_rejection, normalize,
    protocol_rejection, validate,
};
pub use status::DeviceStatus;

// Copyright 2025 The Solar Statistics Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire protocol of the Shelly Pro 3EM RPC notifications.
//!
//! Every message is a JSON envelope with routing fields and an opaque
//! `params` payload whose shape depends on `method`. The meter firmware
//! omits fields freely, so the payload structs default every quantity that
//! the domain treats the same as zero and keep an explicit `Option` only
//! where absence carries meaning.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;

/// The only RPC method this service consumes.
pub const NOTIFY_STATUS: &str = "NotifyStatus";

/// Failure to decode an inbound message. Always handled by dropping the
/// message; never terminates the dispatch loop.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),
    #[error("malformed NotifyStatus params: {0}")]
    MalformedStatus(#[source] serde_json::Error),
}

/// Outer RPC message: routing plus an undecoded `params` body.
#[derive(Debug, Deserialize)]
pub struct DeviceEnvelope {
    #[serde(rename = "src")]
    pub source: String,
    #[serde(rename = "dst")]
    pub destination: String,
    pub method: String,
    pub params: Box<RawValue>,
}

/// Decode one raw MQTT payload into an envelope.
///
/// Missing `src`/`dst`/`method`/`params` or malformed JSON is a
/// [`DecodeError::MalformedEnvelope`].
pub fn decode_envelope(payload: &[u8]) -> Result<DeviceEnvelope, DecodeError> {
    serde_json::from_slice(payload).map_err(DecodeError::MalformedEnvelope)
}

/// Decode the `params` body of a `NotifyStatus` envelope.
pub fn decode_status(params: &RawValue) -> Result<StatusEvent, DecodeError> {
    serde_json::from_str(params.get()).map_err(DecodeError::MalformedStatus)
}

/// Unix epoch timestamp carried on the wire as a fractional number of
/// seconds (`1700000000.5`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnixTimestamp(pub DateTime<Utc>);

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        decode_fractional_epoch(raw)
            .map(UnixTimestamp)
            .ok_or_else(|| D::Error::custom(format!("epoch timestamp out of range: {raw}")))
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fractional =
            self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_nanos()) / 1e9;
        serializer.serialize_f64(fractional)
    }
}

/// Decode a fractional epoch value: whole seconds by truncation toward
/// zero, nanoseconds by rounding the fractional part. Returns `None` when
/// the value does not fit a representable instant.
pub fn decode_fractional_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }

    let mut secs = value.trunc() as i64;
    let mut nanos = (value.fract() * 1e9).round() as i64;

    // Rounding may carry across the second boundary.
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    } else if nanos <= -1_000_000_000 {
        secs -= 1;
        nanos += 1_000_000_000;
    }

    if nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }

    DateTime::from_timestamp(secs, nanos as u32)
}

/// `NotifyStatus` payload. Either sub-structure may be absent; each present
/// one later yields an independent persisted record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEvent {
    #[serde(default)]
    pub ts: Option<UnixTimestamp>,
    #[serde(rename = "em:0", default)]
    pub phases: Option<PhaseStatus>,
    #[serde(rename = "emdata:0", default)]
    pub energy: Option<EnergyStatus>,
}

impl StatusEvent {
    /// Timestamp of the event, or the Unix epoch when the device omitted
    /// `ts` (matches what earlier deployments persisted).
    pub fn time(&self) -> DateTime<Utc> {
        self.ts.map(|ts| ts.0).unwrap_or_default()
    }
}

/// Instantaneous per-phase readings (`em:0`). Any subset of the flat keys
/// may be present; missing quantities read as zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhaseStatus {
    pub id: i32,

    pub a_act_power: f64,
    pub a_aprt_power: f64,
    pub a_current: f64,
    pub a_freq: f64,
    pub a_pf: f64,
    pub a_voltage: f64,

    pub b_act_power: f64,
    pub b_aprt_power: f64,
    pub b_current: f64,
    pub b_freq: f64,
    pub b_pf: f64,
    pub b_voltage: f64,

    pub c_act_power: f64,
    pub c_aprt_power: f64,
    pub c_current: f64,
    pub c_freq: f64,
    pub c_pf: f64,
    pub c_voltage: f64,

    /// `None` when the meter has no neutral-current clamp. Not the same
    /// as a measured zero.
    pub n_current: Option<f64>,

    pub total_act_power: f64,
    pub total_aprt_power: f64,
    pub total_current: f64,
}

/// Cumulative energy counters (`emdata:0`), in watt-hours.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnergyStatus {
    pub id: i32,

    pub a_total_act_energy: f64,
    pub a_total_act_ret_energy: f64,
    pub b_total_act_energy: f64,
    pub b_total_act_ret_energy: f64,
    pub c_total_act_energy: f64,
    pub c_total_act_ret_energy: f64,

    pub total_act: f64,
    pub total_act_ret: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_envelope() {
        let payload = json!({
            "src": "shellypro3em-abc",
            "dst": "events",
            "method": "NotifyStatus",
            "params": {"ts": 1700000000.5}
        })
        .to_string();

        let envelope = decode_envelope(payload.as_bytes()).unwrap();
        assert_eq!(envelope.source, "shellypro3em-abc");
        assert_eq!(envelope.destination, "events");
        assert_eq!(envelope.method, NOTIFY_STATUS);
    }

    #[test]
    fn test_envelope_missing_required_field_fails() {
        for missing in ["src", "dst", "method", "params"] {
            let mut value = json!({
                "src": "dev1",
                "dst": "events",
                "method": "NotifyStatus",
                "params": {}
            });
            value.as_object_mut().unwrap().remove(missing);

            let result = decode_envelope(value.to_string().as_bytes());
            assert!(
                matches!(result, Err(DecodeError::MalformedEnvelope(_))),
                "expected MalformedEnvelope without {missing}"
            );
        }
    }

    #[test]
    fn test_envelope_invalid_json_fails() {
        assert!(matches!(
            decode_envelope(b"not json"),
            Err(DecodeError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_unknown_method_still_decodes() {
        let payload = json!({
            "src": "dev1",
            "dst": "events",
            "method": "NotifyEvent",
            "params": {}
        })
        .to_string();

        let envelope = decode_envelope(payload.as_bytes()).unwrap();
        assert_ne!(envelope.method, NOTIFY_STATUS);
    }

    #[test]
    fn test_fractional_epoch_splits_seconds_and_nanos() {
        let ts = decode_fractional_epoch(1700000000.5).unwrap();
        assert_eq!(ts.timestamp(), 1700000000);
        assert_eq!(ts.timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_fractional_epoch_rounding_carries_into_seconds() {
        let ts = decode_fractional_epoch(1.9999999999).unwrap();
        assert_eq!(ts.timestamp(), 2);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_fractional_epoch_rejects_non_finite() {
        assert!(decode_fractional_epoch(f64::NAN).is_none());
        assert!(decode_fractional_epoch(f64::INFINITY).is_none());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let original = UnixTimestamp(decode_fractional_epoch(1700000000.25).unwrap());
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: UnixTimestamp = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.0.timestamp(), original.0.timestamp());
        let nanos_diff =
            (i64::from(decoded.0.timestamp_subsec_nanos()) - 250_000_000).unsigned_abs();
        assert!(nanos_diff <= 1, "nanos off by {nanos_diff}");
    }

    #[test]
    fn test_status_with_partial_phase_keys() {
        let raw = serde_json::value::to_raw_value(&json!({
            "ts": 1700000000.5,
            "em:0": {"a_act_power": 100.0, "total_act_power": 300.0}
        }))
        .unwrap();

        let status = decode_status(&raw).unwrap();
        let phases = status.phases.unwrap();
        assert_eq!(phases.a_act_power, 100.0);
        assert_eq!(phases.b_act_power, 0.0);
        assert_eq!(phases.c_voltage, 0.0);
        assert_eq!(phases.total_act_power, 300.0);
        assert!(status.energy.is_none());
    }

    #[test]
    fn test_status_with_neither_substructure() {
        let raw = serde_json::value::to_raw_value(&json!({"ts": 1.0})).unwrap();
        let status = decode_status(&raw).unwrap();
        assert!(status.phases.is_none());
        assert!(status.energy.is_none());
    }

    #[test]
    fn test_missing_ts_defaults_to_epoch() {
        let raw = serde_json::value::to_raw_value(&json!({"em:0": {}})).unwrap();
        let status = decode_status(&raw).unwrap();
        assert_eq!(status.time().timestamp(), 0);
    }

    #[test]
    fn test_neutral_current_absent_is_not_zero() {
        let absent = serde_json::value::to_raw_value(&json!({"em:0": {}})).unwrap();
        let zero =
            serde_json::value::to_raw_value(&json!({"em:0": {"n_current": 0.0}})).unwrap();

        let absent = decode_status(&absent).unwrap().phases.unwrap();
        let zero = decode_status(&zero).unwrap().phases.unwrap();

        assert_eq!(absent.n_current, None);
        assert_eq!(zero.n_current, Some(0.0));
        assert_ne!(absent.n_current, zero.n_current);
    }

    #[test]
    fn test_energy_counters_decode() {
        let raw = serde_json::value::to_raw_value(&json!({
            "emdata:0": {
                "a_total_act_energy": 1000.5,
                "a_total_act_ret_energy": 12.5,
                "total_act": 2500.0,
                "total_act_ret": 40.0
            }
        }))
        .unwrap();

        let energy = decode_status(&raw).unwrap().energy.unwrap();
        assert_eq!(energy.a_total_act_energy, 1000.5);
        assert_eq!(energy.a_total_act_ret_energy, 12.5);
        assert_eq!(energy.b_total_act_energy, 0.0);
        assert_eq!(energy.total_act, 2500.0);
        assert_eq!(energy.total_act_ret, 40.0);
    }

    #[test]
    fn test_malformed_params_fails() {
        let raw = serde_json::value::to_raw_value(&json!(["not", "an", "object"])).unwrap();
        assert!(matches!(
            decode_status(&raw),
            Err(DecodeError::MalformedStatus(_))
        ));
    }
}

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

//! Mapping from decoded status payloads to the persisted domain records.
//!
//! The conversions are pure: callers check which sub-structure is present
//! and hand over the inner payload, so there is no error case here.

use chrono::{DateTime, Utc};

use crate::protocol::{EnergyStatus, PhaseStatus};

/// One persisted row of instantaneous readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub time: DateTime<Utc>,
    pub device: String,
    pub phase_a: PhaseMeasurement,
    pub phase_b: PhaseMeasurement,
    pub phase_c: PhaseMeasurement,
    pub total_actual_power: f64,
    pub total_apparent_power: f64,
    pub total_current: f64,
}

/// Instantaneous electrical quantities of a single phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseMeasurement {
    pub actual_power: f64,
    pub apparent_power: f64,
    pub current: f64,
    pub frequency: f64,
    pub power_factor: f64,
    pub voltage: f64,
}

/// One persisted row of cumulative energy counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Counters {
    pub time: DateTime<Utc>,
    pub device: String,
    pub phase_a: EnergyCounters,
    pub phase_b: EnergyCounters,
    pub phase_c: EnergyCounters,
    pub total: EnergyCounters,
}

/// Consumed and returned energy of a single phase, in watt-hours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyCounters {
    pub energy: f64,
    pub energy_returned: f64,
}

/// Build a [`Measurement`] from the `em:0` sub-structure of a status event.
pub fn to_measurement(device: &str, time: DateTime<Utc>, phases: &PhaseStatus) -> Measurement {
    Measurement {
        time,
        device: device.to_string(),
        phase_a: PhaseMeasurement {
            actual_power: phases.a_act_power,
            apparent_power: phases.a_aprt_power,
            current: phases.a_current,
            frequency: phases.a_freq,
            power_factor: phases.a_pf,
            voltage: phases.a_voltage,
        },
        phase_b: PhaseMeasurement {
            actual_power: phases.b_act_power,
            apparent_power: phases.b_aprt_power,
            current: phases.b_current,
            frequency: phases.b_freq,
            power_factor: phases.b_pf,
            voltage: phases.b_voltage,
        },
        phase_c: PhaseMeasurement {
            actual_power: phases.c_act_power,
            apparent_power: phases.c_aprt_power,
            current: phases.c_current,
            frequency: phases.c_freq,
            power_factor: phases.c_pf,
            voltage: phases.c_voltage,
        },
        total_actual_power: phases.total_act_power,
        total_apparent_power: phases.total_aprt_power,
        total_current: phases.total_current,
    }
}

/// Build [`Counters`] from the `emdata:0` sub-structure of a status event.
pub fn to_counters(device: &str, time: DateTime<Utc>, energy: &EnergyStatus) -> Counters {
    Counters {
        time,
        device: device.to_string(),
        phase_a: EnergyCounters {
            energy: energy.a_total_act_energy,
            energy_returned: energy.a_total_act_ret_energy,
        },
        phase_b: EnergyCounters {
            energy: energy.b_total_act_energy,
            energy_returned: energy.b_total_act_ret_energy,
        },
        phase_c: EnergyCounters {
            energy: energy.c_total_act_energy,
            energy_returned: energy.c_total_act_ret_energy,
        },
        total: EnergyCounters {
            energy: energy.total_act,
            energy_returned: energy.total_act_ret,
        },
    }
}

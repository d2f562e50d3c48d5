//! Redfish Resource Type Definitions
//!
//! Serde models for the subset of the DMTF Redfish schema the collectors read.
//!
//! # Design Notes
//!
//! - **Tolerance**: BMC firmware is only loosely conformant. Every field that
//!   a vendor might omit or send as `null` is an `Option<T>` or defaulted.
//! - **Naming**: Redfish uses PascalCase properties; structs rename per field
//!   so the Rust side stays snake_case.
//! - **Links**: navigation properties are kept as [`ODataLink`] and followed
//!   explicitly by the session, never eagerly.
//!
//! # Resources Covered
//!
//! - `/redfish/v1` → [`ServiceRoot`]
//! - `/redfish/v1/Systems/{id}` → [`ComputerSystem`], [`MemorySummary`]
//! - `/redfish/v1/Systems/{id}/Processors/{id}` → [`Processor`]
//! - `/redfish/v1/Chassis/{id}` → [`Chassis`]
//! - `/redfish/v1/Chassis/{id}/Thermal` → [`Thermal`], [`Temperature`], [`Fan`]
//! - `/redfish/v1/Chassis/{id}/Power` → [`Power`], [`PowerSupply`], [`Voltage`], [`PowerControl`]

#![allow(dead_code)] // Allow unused fields in resource structs for completeness
use serde::{Deserialize, Deserializer, Serialize};

pub const SERVICE_ROOT: &str = "/redfish/v1";
pub const SESSIONS: &str = "/redfish/v1/SessionService/Sessions";
pub const SYSTEMS: &str = "/redfish/v1/Systems";
pub const CHASSIS: &str = "/redfish/v1/Chassis";

/// Treats an explicit `null` the same as an absent property
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A navigation property pointing at another resource
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ODataLink {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

/// Any Redfish resource collection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Collection {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Members", default, deserialize_with = "nullable")]
    pub members: Vec<ODataLink>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Status {
    #[serde(rename = "Health", default)]
    pub health: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceRoot {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "RedfishVersion", default)]
    pub redfish_version: Option<String>,
    #[serde(rename = "Systems", default)]
    pub systems: Option<ODataLink>,
    #[serde(rename = "Chassis", default)]
    pub chassis: Option<ODataLink>,
}

/// Login body for `POST /redfish/v1/SessionService/Sessions`
#[derive(Debug, Serialize)]
pub struct SessionLogin<'a> {
    #[serde(rename = "UserName")]
    pub user_name: &'a str,
    #[serde(rename = "Password")]
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComputerSystem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "PowerState", default)]
    pub power_state: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
    #[serde(rename = "MemorySummary", default, deserialize_with = "nullable")]
    pub memory_summary: MemorySummary,
    #[serde(rename = "Processors", default)]
    pub processors: Option<ODataLink>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MemorySummary {
    #[serde(rename = "TotalSystemMemoryGiB", default)]
    pub total_system_memory_gib: Option<f64>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Processor {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Model", default)]
    pub model: Option<String>,
    #[serde(rename = "TotalCores", default)]
    pub total_cores: Option<u32>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chassis {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "ChassisType", default)]
    pub chassis_type: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
    #[serde(rename = "Thermal", default)]
    pub thermal: Option<ODataLink>,
    #[serde(rename = "Power", default)]
    pub power: Option<ODataLink>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Thermal {
    #[serde(rename = "Temperatures", default, deserialize_with = "nullable")]
    pub temperatures: Vec<Temperature>,
    #[serde(rename = "Fans", default, deserialize_with = "nullable")]
    pub fans: Vec<Fan>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Temperature {
    #[serde(rename = "Name", default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "ReadingCelsius", default)]
    pub reading_celsius: Option<f64>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Fan {
    #[serde(rename = "Name", default, deserialize_with = "nullable")]
    pub name: String,
    /// Pre-2017 schemas name fans here instead of `Name`
    #[serde(rename = "FanName", default)]
    pub fan_name: Option<String>,
    #[serde(rename = "Reading", default)]
    pub reading: Option<f64>,
    #[serde(rename = "ReadingRPM", default)]
    pub reading_rpm: Option<f64>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

impl Fan {
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.fan_name.as_deref().unwrap_or_default()
    }

    pub fn speed(&self) -> f64 {
        self.reading.or(self.reading_rpm).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Power {
    #[serde(rename = "PowerSupplies", default, deserialize_with = "nullable")]
    pub power_supplies: Vec<PowerSupply>,
    #[serde(rename = "Voltages", default, deserialize_with = "nullable")]
    pub voltages: Vec<Voltage>,
    #[serde(rename = "PowerControl", default, deserialize_with = "nullable")]
    pub power_control: Vec<PowerControl>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PowerSupply {
    #[serde(rename = "Name", default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "PowerInputWatts", default)]
    pub power_input_watts: Option<f64>,
    #[serde(rename = "PowerOutputWatts", default)]
    pub power_output_watts: Option<f64>,
    #[serde(rename = "LastPowerOutputWatts", default)]
    pub last_power_output_watts: Option<f64>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

impl PowerSupply {
    pub fn output_watts(&self) -> f64 {
        self.power_output_watts
            .or(self.last_power_output_watts)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Voltage {
    #[serde(rename = "Name", default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "ReadingVolts", default)]
    pub reading_volts: Option<f64>,
    #[serde(rename = "Status", default, deserialize_with = "nullable")]
    pub status: Status,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PowerControl {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "PowerConsumedWatts", default)]
    pub power_consumed_watts: Option<f64>,
}

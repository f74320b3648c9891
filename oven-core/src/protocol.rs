//! HTTP payload types
//!
//! All bodies are JSON. Appliance responses share one envelope keyed by a
//! `status` field; state-machine refusals come back in-band as
//! `{"status":"error","message":...}` while malformed input and auth
//! failures use HTTP status codes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::appliance::{Started, Status};
use crate::catalog::{NewProgram, Program, ProgramEntry};

/// Login request body. Fields are optional so a missing one can be
/// reported as a 400 rather than a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub message: String,
}

/// Start request: either a manual `time`/`power` pair or a catalog program
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default, deserialize_with = "lenient_int")]
    pub time: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub power: i64,
    #[serde(default, rename = "programId", alias = "program_id")]
    pub program_id: Option<u32>,
}

impl StartRequest {
    /// Requested time, with out-of-range values mapped to ones validation
    /// rejects
    pub fn time_secs(&self) -> u32 {
        clamp_secs(self.time)
    }

    pub fn power_level(&self) -> u8 {
        clamp_power(self.power)
    }
}

/// Body of `POST /programs/add`. Every field may be missing so the catalog's
/// own checks report what is wrong.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddProgramRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub food: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub time: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub power: i64,
    #[serde(default)]
    pub instructions: String,
}

impl From<AddProgramRequest> for NewProgram {
    fn from(req: AddProgramRequest) -> Self {
        Self {
            name: req.name,
            food: req.food,
            time: clamp_secs(req.time),
            power: clamp_power(req.power),
            instructions: req.instructions,
        }
    }
}

fn clamp_secs(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn clamp_power(value: i64) -> u8 {
    u8::try_from(value.max(0)).unwrap_or(u8::MAX)
}

/// Integer field that also takes floats (truncated), numeric strings and
/// booleans. Anything else reads as 0.
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, int_from_value))
}

fn int_from_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Value of the `status` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Active,
    Inactive,
    Completed,
}

/// Envelope for appliance and simple acknowledgement responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvenResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<u8>,
    #[serde(default, rename = "isPaused", skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OvenResponse {
    fn bare(status: ResponseStatus) -> Self {
        Self {
            status,
            time: None,
            power: None,
            is_paused: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(ResponseStatus::Error)
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(ResponseStatus::Success)
        }
    }

    pub fn started(started: Started, message: impl Into<String>) -> Self {
        Self {
            time: Some(started.time),
            power: Some(started.power),
            is_paused: Some(started.paused),
            ..Self::success(message)
        }
    }

    pub fn paused(remaining: u32) -> Self {
        Self {
            time: Some(remaining),
            is_paused: Some(true),
            ..Self::success("Heating paused")
        }
    }

    pub fn resumed(remaining: u32) -> Self {
        Self {
            time: Some(remaining),
            is_paused: Some(false),
            ..Self::success("Heating resumed")
        }
    }
}

impl From<Status> for OvenResponse {
    fn from(status: Status) -> Self {
        match status {
            Status::Inactive => Self {
                message: Some("No active heating".to_string()),
                ..Self::bare(ResponseStatus::Inactive)
            },
            Status::Completed => Self {
                message: Some("Heating completed".to_string()),
                ..Self::bare(ResponseStatus::Completed)
            },
            Status::Active { time, power, paused } => Self {
                time: Some(time),
                power: Some(power),
                is_paused: Some(paused),
                ..Self::bare(ResponseStatus::Active)
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramListResponse {
    pub status: ResponseStatus,
    pub programs: Vec<ProgramEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramAddedResponse {
    pub status: ResponseStatus,
    pub program: Program,
}

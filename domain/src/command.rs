//! Commands pushed to the remote device.
//!
//! A `Command` serializes to the canonical JSON payload the device expects,
//! e.g. `{"type":"destination","lat":37.7749,"lng":-122.4194}` or
//! `{"type":"speedLimit","speedLimit":60}`. That JSON is what the codec encrypts.
//!
//! Whole numbers are written without a fractional part, the way a JavaScript
//! client would write them, so the ciphertext matches for the same command.

use crate::error::Error;
use crate::location::validate_coordinates;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "destination")]
    Destination {
        #[serde(serialize_with = "number")]
        lat: f64,
        #[serde(serialize_with = "number")]
        lng: f64,
    },
    #[serde(rename = "speedLimit")]
    SpeedLimit {
        /// Speed limit in km/h
        #[serde(rename = "speedLimit", serialize_with = "number")]
        speed_limit: f64,
    },
}

impl Command {
    /// Rejects commands whose fields can't be meaningfully delivered.
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            Command::Destination { lat, lng } => validate_coordinates(lat, lng),
            Command::SpeedLimit { speed_limit } => {
                if speed_limit.is_finite() && speed_limit > 0.0 {
                    Ok(())
                } else {
                    Err(Error::validation(format!(
                        "speedLimit must be a positive number, got {speed_limit}"
                    )))
                }
            }
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Destination { .. } => "destination",
            Command::SpeedLimit { .. } => "speedLimit",
        }
    }
}

/// Largest magnitude below which every integral f64 is exact as an i64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

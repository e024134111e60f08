use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry in the alert log, e.g. a speed limit violation reported by the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[schema(example = "Speed alert")]
    pub message: String,
    #[schema(example = "2023-12-10T10:00:00Z")]
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            timestamp,
        }
    }

    /// Creates an alert stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self::new(message, Utc::now())
    }
}

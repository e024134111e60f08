//! Device-originated reports.
//!
//! The vehicle reports its position and alerts as ciphertext produced with the
//! same key material as outbound commands. A report is decrypted, decoded and
//! applied to the matching store, which in turn fans the change out to clients.
//! A report that fails to decrypt or decode is dropped; it never touches state.

use crate::alert::Alert;
use crate::encryption::Codec;
use crate::error::Error;
use crate::location::Location;
use crate::store::StateStores;
use chrono::{DateTime, Utc};
use events::Seq;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceReport {
    Location {
        lat: f64,
        lng: f64,
    },
    Alert {
        message: String,
        /// Defaults to the time the report is decoded when the device omits it
        #[serde(default = "Utc::now")]
        timestamp: DateTime<Utc>,
    },
}

/// Decrypts and decodes a single report.
pub fn decode(codec: &Codec, ciphertext: &str) -> Result<DeviceReport, Error> {
    Ok(codec.decrypt::<DeviceReport>(ciphertext)?)
}

/// Decrypts a report and applies it to the stores, returning the sequence
/// number the owning store assigned to the update.
pub fn apply(codec: &Codec, stores: &StateStores, ciphertext: &str) -> Result<Seq, Error> {
    let report = match decode(codec, ciphertext) {
        Ok(report) => report,
        Err(e) => {
            warn!("Dropping device report that failed to decode: {e:?}");
            return Err(e);
        }
    };

    match report {
        DeviceReport::Location { lat, lng } => {
            let location = Location::new(lat, lng);
            location.validate()?;
            debug!("Device reported location {lat},{lng}");
            Ok(stores.location.update(location))
        }
        DeviceReport::Alert { message, timestamp } => {
            info!("Device reported alert: {message}");
            Ok(stores.alerts.update(Alert::new(message, timestamp)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use serde_json::json;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const TEST_IV: &str = "000102030405060708090a0b0c0d0e0f";

    fn codec() -> Codec {
        Codec::from_hex(TEST_KEY, TEST_IV).unwrap()
    }

    #[test]
    fn location_report_updates_location_store() {
        let stores = StateStores::new();
        let ciphertext = codec()
            .encrypt(&json!({"type": "location", "lat": 37.7749, "lng": -122.4194}))
            .unwrap();

        let seq = apply(&codec(), &stores, &ciphertext).unwrap();

        assert_eq!(seq, 1);
        assert_eq!(stores.location.get(), Some(Location::new(37.7749, -122.4194)));
    }

    #[test]
    fn alert_report_appends_to_alert_log() {
        let stores = StateStores::new();
        let ciphertext = codec()
            .encrypt(&json!({
                "type": "alert",
                "message": "Speed alert",
                "timestamp": "2023-12-10T10:00:00Z"
            }))
            .unwrap();

        apply(&codec(), &stores, &ciphertext).unwrap();

        let alerts = stores.alerts.get_all();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "Speed alert");
        assert_eq!(alerts[0].timestamp.to_rfc3339(), "2023-12-10T10:00:00+00:00");
    }

    #[test]
    fn alert_without_timestamp_is_stamped_on_arrival() {
        let before = Utc::now();
        let report = decode(
            &codec(),
            &codec()
                .encrypt(&json!({"type": "alert", "message": "Harsh braking"}))
                .unwrap(),
        )
        .unwrap();

        match report {
            DeviceReport::Alert { timestamp, .. } => assert!(timestamp >= before),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn undecryptable_report_is_dropped_without_touching_state() {
        let stores = StateStores::new();

        let err = apply(&codec(), &stores, "deadbeef").unwrap_err();

        assert_eq!(err.error_kind, DomainErrorKind::Codec);
        assert_eq!(stores.location.get(), None);
        assert!(stores.alerts.is_empty());
    }

    #[test]
    fn unknown_report_type_is_a_codec_error() {
        let stores = StateStores::new();
        let ciphertext = codec().encrypt(&json!({"type": "battery", "level": 3})).unwrap();

        let err = apply(&codec(), &stores, &ciphertext).unwrap_err();
        assert_eq!(err.error_kind, DomainErrorKind::Codec);
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let stores = StateStores::new();
        let ciphertext = codec()
            .encrypt(&json!({"type": "location", "lat": 123.0, "lng": 0.0}))
            .unwrap();

        let err = apply(&codec(), &stores, &ciphertext).unwrap_err();
        assert!(matches!(err.error_kind, DomainErrorKind::Validation(_)));
        assert_eq!(stores.location.get(), None);
    }
}

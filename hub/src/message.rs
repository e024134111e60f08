use axum::extract::ws::Message as Frame;
use events::{StateEvent, StateSnapshot};
use serde::Serialize;
use serde_json::Value;

/// Trait for getting the wire type name of a message
pub trait MessageType {
    fn message_type(&self) -> &'static str;
}

/// Messages pushed to subscribers, serialized as `{"type": ..., "data": ...}`.
///
/// `Location` is used both in the admission snapshot and for incremental
/// updates. `Alerts` (the whole log) only ever appears in the snapshot and
/// `Alert` (one new entry) only as an incremental update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    /// Current location, `null` until the first report
    #[serde(rename = "location")]
    Location(Option<Value>),
    /// The full alert log in append order
    #[serde(rename = "alerts")]
    Alerts(Vec<Value>),
    /// A single newly appended alert
    #[serde(rename = "alert")]
    Alert(Value),
}

impl MessageType for Message {
    fn message_type(&self) -> &'static str {
        match self {
            Message::Location(_) => "location",
            Message::Alerts(_) => "alerts",
            Message::Alert(_) => "alert",
        }
    }
}

impl Message {
    /// The admission batch, in the order it must be sent.
    pub fn snapshot(snapshot: &StateSnapshot) -> [Message; 2] {
        [
            Message::Location(snapshot.location.clone()),
            Message::Alerts(snapshot.alerts.clone()),
        ]
    }

    pub fn from_event(event: &StateEvent) -> Self {
        match event {
            StateEvent::LocationUpdated { location, .. } => Message::Location(Some(location.clone())),
            StateEvent::AlertAppended { alert, .. } => Message::Alert(alert.clone()),
        }
    }

    /// Serializes to a WebSocket text frame.
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        Ok(Frame::Text(serde_json::to_string(self)?.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_serializes_with_type_and_data() {
        let message = Message::Location(Some(json!({"lat": 37.7749, "lng": -122.4194})));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "location", "data": {"lat": 37.7749, "lng": -122.4194}})
        );
    }

    #[test]
    fn absent_location_serializes_as_null_data() {
        assert_eq!(
            serde_json::to_value(Message::Location(None)).unwrap(),
            json!({"type": "location", "data": null})
        );
    }

    #[test]
    fn snapshot_is_location_then_alerts() {
        let snapshot = StateSnapshot {
            location: None,
            location_seq: 0,
            alerts: vec![json!({"message": "Speed alert"})],
            alerts_seq: 1,
        };

        let [first, second] = Message::snapshot(&snapshot);

        assert_eq!(first.message_type(), "location");
        assert_eq!(
            serde_json::to_value(&second).unwrap(),
            json!({"type": "alerts", "data": [{"message": "Speed alert"}]})
        );
    }

    #[test]
    fn alert_event_becomes_single_alert_message() {
        let event = StateEvent::AlertAppended {
            seq: 4,
            alert: json!({"message": "Speed alert", "timestamp": "2023-12-10T10:00:00Z"}),
        };

        let message = Message::from_event(&event);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "alert", "data": {"message": "Speed alert", "timestamp": "2023-12-10T10:00:00Z"}})
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Events, Identifier};

/// One inbound JSON frame, pre-parsed enough to route on `cmd`. Handlers
/// pull their specific payload back out of `payload` with
/// `serde_json::from_value`.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundCommand {
    pub cmd: i32,
    #[serde(default)]
    pub identifier: Identifier,
    #[serde(default)]
    pub recorder_type: Option<i32>,
    /// Everything else in the object, for command-specific deserialization.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl InboundCommand {
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.payload.clone()))
    }
}

/// One outbound JSON frame: `event` plus `identifier` (when applicable) plus
/// whatever extra fields that event carries.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub event: Events,
    pub identifier: Option<Identifier>,
    pub extra: Map<String, Value>,
}

impl OutboundEvent {
    pub fn new(event: Events) -> Self {
        Self {
            event,
            identifier: None,
            extra: Map::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        for (k, v) in extra {
            self.extra.insert(k, v);
        }
        self
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("event".to_string(), Value::from(self.event.as_i32()));
        if let Some(id) = self.identifier {
            map.insert("identifier".to_string(), Value::from(id.0));
        }
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_json()).expect("event JSON is always serializable")
    }
}

impl Serialize for OutboundEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_command_parses_flat_payload() {
        let raw = serde_json::json!({
            "cmd": 4,
            "identifier": 7,
            "recorder_type": 1,
            "force": true
        });
        let cmd: InboundCommand = serde_json::from_value(raw).unwrap();
        assert_eq!(cmd.cmd, 4);
        assert_eq!(cmd.identifier, Identifier(7));
        assert_eq!(cmd.recorder_type, Some(1));
        assert_eq!(cmd.payload.get("force").unwrap(), true);
    }

    #[test]
    fn outbound_event_serializes_event_and_extra_fields() {
        let event = OutboundEvent::new(Events::RecordingStopped)
            .with_identifier(Identifier(3))
            .with_field("code", 0);
        let json = event.to_json();
        assert_eq!(json["event"], 6);
        assert_eq!(json["identifier"], 3);
        assert_eq!(json["code"], 0);
    }
}

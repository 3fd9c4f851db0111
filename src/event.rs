use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// A timeline event as carried on the upstream bus and re-emitted to
/// clients. `event` names the activity ("update", "delete", "notification",
/// ...); `payload` carries its wire form verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub payload: EventPayload,
}

/// Dual representation of an event payload: the exact bytes it arrived as,
/// and — when those bytes are themselves a JSON string — the string they
/// decode to. WebSocket/SSE re-emission always uses the raw bytes; mute
/// filtering and the SSE `data:` line use the decoded string. Re-encoding
/// the decoded string instead of re-emitting the raw bytes would silently
/// change payloads that aren't plain JSON strings.
#[derive(Clone, Debug)]
pub struct EventPayload {
    raw: Box<RawValue>,
    decoded: Option<String>,
}

impl EventPayload {
    pub fn raw_bytes(&self) -> &str {
        self.raw.get()
    }

    pub fn decoded_str(&self) -> Option<&str> {
        self.decoded.as_deref()
    }
}

impl<'de> Deserialize<'de> for EventPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let decoded = serde_json::from_str::<String>(raw.get()).ok();
        Ok(EventPayload { raw, decoded })
    }
}

impl Serialize for EventPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

/// Decode target for mute-filtering an "update" event's payload. Missing
/// keys default to zero values rather than failing to decode, the same way
/// the upstream source tolerates sparse payloads.
#[derive(Debug, Default, Deserialize)]
pub struct MutePayload {
    #[serde(default)]
    pub account: AccountRef,
    #[serde(default)]
    pub mentions: Vec<AccountRef>,
    #[serde(default)]
    pub reblog: ReblogRef,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct AccountRef {
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReblogRef {
    #[serde(default)]
    pub account: AccountRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_payload_preserves_raw_bytes_for_object_payload() {
        let event: Event = serde_json::from_str(r#"{"event":"update","payload":{"a":1}}"#).unwrap();
        assert_eq!(event.payload.raw_bytes(), r#"{"a":1}"#);
        assert_eq!(event.payload.decoded_str(), None);

        let reserialized = serde_json::to_string(&event).unwrap();
        assert_eq!(reserialized, r#"{"event":"update","payload":{"a":1}}"#);
    }

    #[test]
    fn event_payload_decodes_json_string_payload() {
        let event: Event = serde_json::from_str(r#"{"event":"","payload":"{}"}"#).unwrap();
        assert_eq!(event.payload.raw_bytes(), r#""{}""#);
        assert_eq!(event.payload.decoded_str(), Some("{}"));
    }

    #[test]
    fn event_payload_empty_string_decodes_to_empty_string() {
        let event: Event = serde_json::from_str(r#"{"event":"","payload":""}"#).unwrap();
        assert_eq!(event.payload.decoded_str(), Some(""));
    }

    #[test]
    fn mute_payload_defaults_missing_fields() {
        let payload: MutePayload = serde_json::from_str(r#"{"mentions":[{"id":42}]}"#).unwrap();
        assert_eq!(payload.account.id, 0);
        assert_eq!(payload.mentions.len(), 1);
        assert_eq!(payload.mentions[0].id, 42);
        assert_eq!(payload.reblog.account.id, 0);
    }
}

//! OneBot v11 wire types (§6, §9). Events are weakly typed in the protocol,
//! so inbound events are modeled as a tagged sum over `post_type` with a
//! fallback raw-bag variant that round-trips unknown fields bit-exact — the
//! forwarding path needs to preserve everything it doesn't touch.
#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only fields the core decodes out of an inbound `message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEventFields {
    pub self_id: i64,
    pub message_type: String,
    #[serde(default)]
    pub sub_type: String,
    pub message_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    pub raw_message: String,
    pub sender: SenderFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderFields {
    #[serde(default)]
    pub nickname: String,
}

/// The only fields decoded out of an inbound `meta_event`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaEventFields {
    pub meta_event_type: String,
    #[serde(default)]
    pub sub_type: String,
}

/// An inbound frame, decoded just enough to branch on `post_type`
/// (§4.6). `raw` always holds the full, unmodified JSON value so the
/// forwarding path can deep-copy-and-patch it without re-serializing from a
/// narrow struct.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message { fields: MessageEventFields, raw: Value },
    MetaEvent { fields: MetaEventFields, raw: Value },
    Notice { raw: Value },
    Request { raw: Value },
    /// `post_type` present but not one of the four known values, or absent.
    Unknown { raw: Value },
}

/// Parse a decoded JSON value into an [`InboundEvent`]. Never fails — an
/// event this module can't make sense of becomes `Unknown` rather than an
/// error, matching the "drop silently" propagation policy (§7) one layer up
/// (the caller still gets to decide to drop it).
pub fn decode_event(raw: Value) -> InboundEvent {
    let post_type = raw.get("post_type").and_then(Value::as_str).map(str::to_string);

    match post_type.as_deref() {
        Some("message") => match serde_json::from_value::<MessageEventFields>(raw.clone()) {
            Ok(fields) => InboundEvent::Message { fields, raw },
            Err(_) => InboundEvent::Unknown { raw },
        },
        Some("meta_event") => match serde_json::from_value::<MetaEventFields>(raw.clone()) {
            Ok(fields) => InboundEvent::MetaEvent { fields, raw },
            Err(_) => InboundEvent::Unknown { raw },
        },
        Some("notice") => InboundEvent::Notice { raw },
        Some("request") => InboundEvent::Request { raw },
        _ => InboundEvent::Unknown { raw },
    }
}

/// The reply action schema the gateway emits toward the upstream adapter,
/// and the schema it speaks as an outbound client toward downstream bots.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyAction {
    pub action: ReplyActionKind,
    pub params: ReplyParams,
    pub echo: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyActionKind {
    SendGroupMsg,
    SendPrivateMsg,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub message: String,
}

impl ReplyAction {
    /// Build a reply targeting the group if present, else the private user.
    pub fn new(message_id: i64, user_id: i64, group_id: Option<i64>, message: String) -> Self {
        let echo = format!("reply_{message_id}");
        match group_id {
            Some(group_id) => Self {
                action: ReplyActionKind::SendGroupMsg,
                params: ReplyParams {
                    group_id: Some(group_id),
                    user_id: None,
                    message,
                },
                echo,
            },
            None => Self {
                action: ReplyActionKind::SendPrivateMsg,
                params: ReplyParams {
                    group_id: None,
                    user_id: Some(user_id),
                    message,
                },
                echo,
            },
        }
    }
}

/// Build the lifecycle-connect meta-event emitted right after an outbound
/// WebSocket connection opens, before accepting sends.
pub fn lifecycle_connect_event(self_id: i64, now_unix: i64) -> Value {
    serde_json::json!({
        "post_type": "meta_event",
        "meta_event_type": "lifecycle",
        "sub_type": "connect",
        "self_id": self_id,
        "time": now_unix,
    })
}

/// Deep-copy `raw_event`, overwrite `self_id`, `message` and `raw_message`,
/// and leave every other field byte-for-byte untouched (§4.6, §9).
pub fn patch_forward_envelope(raw_event: &Value, self_id: i64, outbound_text: &str) -> Value {
    let mut patched = raw_event.clone();
    if let Value::Object(map) = &mut patched {
        map.insert("self_id".to_string(), Value::from(self_id));
        map.insert("message".to_string(), Value::from(outbound_text));
        map.insert("raw_message".to_string(), Value::from(outbound_text));
    }
    patched
}

/// Synthesize a minimal OneBot v11 message event when there is no inbound
/// `raw_event` to patch (§4.6).
pub fn synthesize_forward_envelope(
    self_id: i64,
    user_id: i64,
    group_id: Option<i64>,
    message: &str,
    message_id: i64,
    now_unix: i64,
) -> Value {
    let mut event = serde_json::json!({
        "post_type": "message",
        "message_type": if group_id.is_some() { "group" } else { "private" },
        "sub_type": "normal",
        "message_id": message_id,
        "time": now_unix,
        "self_id": self_id,
        "user_id": user_id,
        "message": message,
        "raw_message": message,
        "font": 0,
        "sender": {
            "user_id": user_id,
            "nickname": "User",
            "sex": "unknown",
            "age": 0,
        },
    });

    if let Some(group_id) = group_id {
        if let Value::Object(map) = &mut event {
            map.insert("group_id".to_string(), Value::from(group_id));
        }
    }

    event
}

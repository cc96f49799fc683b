//! # Bridge Message
//!
//! Every piece of traffic crossing the bridge is a [`BridgeMessage`]. On the
//! wire a message is a keyed map:
//!
//! ```text
//! { "id": "<uuid>", "name": "getUser", "type": "event" | "request" | "response",
//!   "data": <any json>?, "error": { "code": "...", "message": "..." }? }
//! ```
//!
//! `error` only appears on responses whose handler failed.

use std::str::FromStr;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult, DecodeError, DecodeResult, HandlerFailure};

pub const BRIDGE_MSG_ID: &str = "id";
pub const BRIDGE_MSG_NAME: &str = "name";
pub const BRIDGE_MSG_TYPE: &str = "type";
pub const BRIDGE_MSG_DATA: &str = "data";
pub const BRIDGE_MSG_ERROR: &str = "error";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    Event,
    Request,
    Response,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeMessage {
    id: String,
    name: String,
    message_type: MessageType,
    data: Option<Value>,
    error: Option<HandlerFailure>,
}

impl BridgeMessage {
    /// Creates an event or request with a fresh id.
    ///
    /// Responses must reuse the id of the request they answer, so they are
    /// built with [`BridgeMessage::response`] or [`BridgeMessage::failure`].
    pub fn create(
        name: impl Into<String>,
        message_type: MessageType,
        data: Option<Value>,
    ) -> BridgeResult<Self> {
        if message_type == MessageType::Response {
            return Err(BridgeError::InvalidMessage(
                "responses require the id of the originating request".to_string(),
            ));
        }
        Self::build(new_message_id(), name.into(), message_type, data, None)
    }

    pub fn event(name: impl Into<String>, data: Option<Value>) -> BridgeResult<Self> {
        Self::create(name, MessageType::Event, data)
    }

    pub fn request(name: impl Into<String>, data: Option<Value>) -> BridgeResult<Self> {
        Self::create(name, MessageType::Request, data)
    }

    pub fn response(
        request_id: impl Into<String>,
        name: impl Into<String>,
        data: Option<Value>,
    ) -> BridgeResult<Self> {
        Self::build(
            request_id.into(),
            name.into(),
            MessageType::Response,
            data,
            None,
        )
    }

    pub fn failure(
        request_id: impl Into<String>,
        name: impl Into<String>,
        failure: HandlerFailure,
    ) -> BridgeResult<Self> {
        Self::build(
            request_id.into(),
            name.into(),
            MessageType::Response,
            None,
            Some(failure),
        )
    }

    /// Builds the response answering `self`, carrying either data or a failure.
    pub fn reply(&self, outcome: Result<Option<Value>, HandlerFailure>) -> BridgeResult<Self> {
        match outcome {
            Ok(data) => Self::response(&self.id, &self.name, data),
            Err(failure) => Self::failure(&self.id, &self.name, failure),
        }
    }

    fn build(
        id: String,
        name: String,
        message_type: MessageType,
        data: Option<Value>,
        error: Option<HandlerFailure>,
    ) -> BridgeResult<Self> {
        if name.is_empty() {
            return Err(BridgeError::InvalidMessage(
                "message name must not be empty".to_string(),
            ));
        }
        if id.is_empty() {
            return Err(BridgeError::InvalidMessage(
                "message id must not be empty".to_string(),
            ));
        }
        // `null` and absent data are the same thing on the wire.
        let data = data.filter(|value| !value.is_null());
        Ok(Self {
            id,
            name,
            message_type,
            data,
            error,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&HandlerFailure> {
        self.error.as_ref()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Consumes a response into the payload handed to the requester.
    pub fn into_outcome(self) -> Result<Option<Value>, HandlerFailure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.data),
        }
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert(BRIDGE_MSG_ID.to_string(), Value::String(self.id.clone()));
        map.insert(
            BRIDGE_MSG_NAME.to_string(),
            Value::String(self.name.clone()),
        );
        map.insert(
            BRIDGE_MSG_TYPE.to_string(),
            Value::String(self.message_type.to_string()),
        );
        if let Some(data) = &self.data {
            map.insert(BRIDGE_MSG_DATA.to_string(), data.clone());
        }
        if let Some(error) = &self.error {
            map.insert(
                BRIDGE_MSG_ERROR.to_string(),
                serde_json::json!({ "code": error.code, "message": error.message }),
            );
        }
        Value::Object(map)
    }

    pub fn from_wire(raw: &Value) -> DecodeResult<Self> {
        let map = raw.as_object().ok_or(DecodeError::NotAMap)?;

        let id = required_str(map, BRIDGE_MSG_ID)?;
        if id.is_empty() {
            return Err(DecodeError::InvalidField {
                field: BRIDGE_MSG_ID.to_string(),
                expected: "non-empty string",
            });
        }
        let name = required_str(map, BRIDGE_MSG_NAME)?;
        if name.is_empty() {
            return Err(DecodeError::EmptyName);
        }
        let type_tag = required_str(map, BRIDGE_MSG_TYPE)?;
        let message_type = MessageType::from_str(type_tag)
            .map_err(|_| DecodeError::UnknownMessageType(type_tag.to_string()))?;

        let data = match map.get(BRIDGE_MSG_DATA) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        };

        let error = match map.get(BRIDGE_MSG_ERROR) {
            None | Some(Value::Null) => None,
            Some(_) if message_type != MessageType::Response => {
                return Err(DecodeError::UnexpectedError)
            }
            Some(value) => Some(decode_failure(value)?),
        };

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            message_type,
            data,
            error,
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_wire().to_string()
    }

    pub fn from_json_str(raw: &str) -> DecodeResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::Json(e.to_string()))?;
        Self::from_wire(&value)
    }
}

pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> DecodeResult<&'a str> {
    match map.get(key) {
        None => Err(DecodeError::MissingField(key.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(DecodeError::InvalidField {
            field: key.to_string(),
            expected: "string",
        }),
    }
}

fn decode_failure(value: &Value) -> DecodeResult<HandlerFailure> {
    let map = value.as_object().ok_or(DecodeError::InvalidField {
        field: BRIDGE_MSG_ERROR.to_string(),
        expected: "map",
    })?;
    // The remote side may omit the code; keep the message.
    let code = match map.get("code") {
        Some(Value::String(code)) => code.clone(),
        _ => "UNKNOWN".to_string(),
    };
    let message = match map.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Ok(HandlerFailure { code, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_and_request_get_fresh_ids() {
        let a = BridgeMessage::event("loggedOut", None).unwrap();
        let b = BridgeMessage::request("getUser", None).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
        assert_eq!(a.message_type(), MessageType::Event);
        assert_eq!(b.message_type(), MessageType::Request);
    }

    #[test]
    fn test_create_rejects_response_and_empty_name() {
        assert!(matches!(
            BridgeMessage::create("getUser", MessageType::Response, None),
            Err(BridgeError::InvalidMessage(_))
        ));
        assert!(matches!(
            BridgeMessage::event("", None),
            Err(BridgeError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_reply_reuses_request_id() {
        let request = BridgeMessage::request("getUser", Some(json!({"id": 7}))).unwrap();
        let response = request.reply(Ok(Some(json!({"name": "Ann"})))).unwrap();
        assert_eq!(response.id(), request.id());
        assert_eq!(response.name(), "getUser");
        assert_eq!(response.message_type(), MessageType::Response);

        let failed = request
            .reply(Err(HandlerFailure::new("E_DB", "down")))
            .unwrap();
        assert!(failed.is_failure());
        assert_eq!(
            failed.into_outcome(),
            Err(HandlerFailure::new("E_DB", "down"))
        );
    }

    #[test]
    fn test_wire_shape() {
        let message = BridgeMessage::response("r1", "getUser", Some(json!({"name": "Ann"}))).unwrap();
        assert_eq!(
            message.to_wire(),
            json!({"id": "r1", "name": "getUser", "type": "response", "data": {"name": "Ann"}})
        );

        let event = BridgeMessage::event("loggedOut", None).unwrap();
        let wire = event.to_wire();
        assert!(wire.get(BRIDGE_MSG_DATA).is_none());
        assert_eq!(wire[BRIDGE_MSG_TYPE], "event");
    }

    #[test]
    fn test_wire_round_trip_keeps_every_field() {
        let failure = BridgeMessage::failure("r2", "save", HandlerFailure::new("E", "boom")).unwrap();
        assert_eq!(BridgeMessage::from_wire(&failure.to_wire()).unwrap(), failure);

        let request = BridgeMessage::request("save", Some(json!([1, 2, {"a": null}]))).unwrap();
        let parsed = BridgeMessage::from_json_str(&request.to_json_string()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            BridgeMessage::from_wire(&json!("nope")),
            Err(DecodeError::NotAMap)
        );
        assert_eq!(
            BridgeMessage::from_wire(&json!({"name": "x", "type": "event"})),
            Err(DecodeError::MissingField("id".to_string()))
        );
        assert_eq!(
            BridgeMessage::from_wire(&json!({"id": "1", "name": "x", "type": "req"})),
            Err(DecodeError::UnknownMessageType("req".to_string()))
        );
        assert_eq!(
            BridgeMessage::from_wire(&json!({"id": "1", "name": "", "type": "event"})),
            Err(DecodeError::EmptyName)
        );
        assert_eq!(
            BridgeMessage::from_wire(&json!({"id": 1, "name": "x", "type": "event"})),
            Err(DecodeError::InvalidField {
                field: "id".to_string(),
                expected: "string"
            })
        );
        assert_eq!(
            BridgeMessage::from_wire(
                &json!({"id": "1", "name": "x", "type": "event", "error": {"code": "E"}})
            ),
            Err(DecodeError::UnexpectedError)
        );
        assert!(matches!(
            BridgeMessage::from_json_str("{"),
            Err(DecodeError::Json(_))
        ));
    }
}

//! 受信フレームの検証
//!
//! テキストフレームは UseCase に渡る前にここで検証する。
//!
//! 1. JSON でない、オブジェクトでない、文字列の `type` がない → `InvalidMessageFormat`
//! 2. 既知の `type` だがペイロードをデコードできない → `SchemaValidationFailed`
//! 3. 未知の `type` → そのまま転送（strict モードでは拒否）

use serde_json::Value;

use crate::{
    infrastructure::dto::websocket::{ClientMessage, canonical_type},
    usecase::CollabError,
};

/// 検証を通過したフレーム
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Known(ClientMessage),
    /// 未知の `type`。中身を解釈せずにルームへ転送する
    Unknown { message_type: String, payload: Value },
}

impl InboundFrame {
    pub fn type_name(&self) -> &str {
        match self {
            InboundFrame::Known(message) => message.type_name(),
            InboundFrame::Unknown { message_type, .. } => message_type,
        }
    }
}

pub fn validate_frame(text: &str, strict: bool) -> Result<InboundFrame, CollabError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CollabError::InvalidMessageFormat(format!("not valid JSON ({})", e)))?;

    let message_type = match value.as_object().and_then(|obj| obj.get("type")) {
        Some(Value::String(message_type)) => message_type.clone(),
        Some(_) => {
            return Err(CollabError::InvalidMessageFormat(
                "field `type` must be a string".to_string(),
            ));
        }
        None => {
            return Err(CollabError::InvalidMessageFormat(
                "missing field `type`".to_string(),
            ));
        }
    };

    match canonical_type(&message_type) {
        Some(canonical) => serde_json::from_value::<ClientMessage>(value)
            .map(InboundFrame::Known)
            .map_err(|e| CollabError::SchemaValidationFailed {
                message_type: canonical.to_string(),
                reason: e.to_string(),
            }),
        None if strict => Err(CollabError::InvalidMessageFormat(format!(
            "unknown message type '{}'",
            message_type
        ))),
        None => Ok(InboundFrame::Unknown {
            message_type,
            payload: value,
        }),
    }
}

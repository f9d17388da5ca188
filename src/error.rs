use thiserror::Error;
use wasm_bindgen::JsValue;

/// Everything that can go wrong around the store.
///
/// The mutations themselves never fail; these errors come from parsing what
/// the host hands us and from talking to `localStorage`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown mutation: {0}")]
    UnknownMutation(String),

    #[error("mutation {0} requires a payload")]
    MissingPayload(&'static str),

    #[error("invalid payload for {mutation}: {reason}")]
    InvalidPayload {
        mutation: &'static str,
        reason: String,
    },

    #[error("commit called while another mutation is in progress")]
    Reentrant,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<StoreError> for JsValue {
    fn from(err: StoreError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

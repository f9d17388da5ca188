// src/messages.rs
//
// The mutations that can be committed to the store.
//
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Names accepted by [`Mutation::from_name`], in declaration order.
pub const MUTATION_NAMES: [&str; 3] = ["setMsg", "resetMsg", "setUserName"];

/// A single state change. Serialized object-style, i.e.
/// `{"type": "setUserName", "payload": "Bob"}` or `{"type": "setMsg"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Mutation {
    /// Append the current username to the message.
    SetMsg,
    /// Put the message back to the default greeting.
    ResetMsg,
    /// Replace the username.
    SetUserName(String),
}

impl Mutation {
    /// Stable name the host uses to address this mutation.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetMsg => MUTATION_NAMES[0],
            Mutation::ResetMsg => MUTATION_NAMES[1],
            Mutation::SetUserName(_) => MUTATION_NAMES[2],
        }
    }

    /// Build a mutation from its name and the optional second argument of a
    /// `commit(name, payload)` call.
    ///
    /// `setMsg` and `resetMsg` take no data, so a payload handed to them is
    /// dropped.
    pub fn from_name(name: &str, payload: Option<String>) -> Result<Self, StoreError> {
        match name {
            "setMsg" => Ok(Mutation::SetMsg),
            "resetMsg" => Ok(Mutation::ResetMsg),
            "setUserName" => payload
                .map(Mutation::SetUserName)
                .ok_or(StoreError::MissingPayload("setUserName")),
            other => Err(StoreError::UnknownMutation(other.to_string())),
        }
    }
}

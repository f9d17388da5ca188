//! `localStorage` persistence for the store snapshot.

use serde_json::{from_str, to_string};
use web_sys::Storage;

use crate::error::StoreError;
use crate::state::StoreState;

/// Serialize the state record into the layout kept in `localStorage`.
pub fn encode_state(state: &StoreState) -> Result<String, StoreError> {
    Ok(to_string(state)?)
}

pub fn decode_state(raw: &str) -> Result<StoreState, StoreError> {
    Ok(from_str(raw)?)
}

fn local_storage() -> Result<Storage, StoreError> {
    let window = web_sys::window().ok_or_else(|| StoreError::Storage("no global window exists".to_string()))?;
    window
        .local_storage()
        .map_err(|e| StoreError::Storage(format!("{:?}", e)))?
        .ok_or_else(|| StoreError::Storage("no local storage exists".to_string()))
}

/// Save the current state under `key`.
pub fn save_state(state: &StoreState, key: &str) -> Result<(), StoreError> {
    let raw = encode_state(state)?;
    local_storage()?
        .set_item(key, &raw)
        .map_err(|e| StoreError::Storage(format!("{:?}", e)))
}

/// Load a previously saved state. `Ok(None)` when nothing is stored yet.
pub fn load_state(key: &str) -> Result<Option<StoreState>, StoreError> {
    let raw = local_storage()?
        .get_item(key)
        .map_err(|e| StoreError::Storage(format!("{:?}", e)))?;

    match raw {
        Some(raw) => decode_state(&raw).map(Some),
        None => Ok(None),
    }
}

/// Drop the saved snapshot.
pub fn clear_state(key: &str) -> Result<(), StoreError> {
    local_storage()?
        .remove_item(key)
        .map_err(|e| StoreError::Storage(format!("{:?}", e)))
}

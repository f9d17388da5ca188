use wasm_bindgen::prelude::*;

mod macros;

pub mod config;
pub mod constants; // Module for constants and default values
pub mod error;
pub mod messages; // Mutation enum
pub mod state;
pub mod storage;
pub mod update; // The mutator table

pub use config::StoreConfig;
pub use error::StoreError;
pub use messages::{Mutation, MUTATION_NAMES};
pub use state::{dispatch_global_mutation, Store, StoreState, SubscriptionId};

use config::{set_store_config, store_config};
use state::{with_store, with_store_mut};

// Entry point for the WASM module
#[wasm_bindgen(start)]
pub fn start() {
    // Initialize better panic messages
    console_error_panic_hook::set_once();
}

/// (Re)create the global store. `config` may be `undefined` or a partial
/// `{persist, storageKey, initialUsername}` object.
#[wasm_bindgen(js_name = initStore)]
pub fn init_store(config: JsValue) -> Result<(), JsValue> {
    let config: StoreConfig = if config.is_undefined() || config.is_null() {
        StoreConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };

    let mut store = Store::with_config(&config);
    if config.persist {
        match storage::load_state(&config.storage_key) {
            Ok(Some(saved)) => store.replace_state(saved),
            Ok(None) => {}
            Err(e) => store_log!(warn, "Ignoring saved state: {}", e),
        }
    }

    set_store_config(config);
    with_store_mut(|current| *current = store)?;
    Ok(())
}

/// `commit(name, payload?)`: apply the named mutation to the global store.
#[wasm_bindgen]
pub fn commit(name: &str, payload: JsValue) -> Result<(), JsValue> {
    let payload = string_payload(name, &payload)?;
    let mutation = Mutation::from_name(name, payload)?;
    dispatch_global_mutation(mutation)?;
    Ok(())
}

/// Object-style commit: `commitObject({ type: "setUserName", payload: "Bob" })`.
#[wasm_bindgen(js_name = commitObject)]
pub fn commit_object(mutation: JsValue) -> Result<(), JsValue> {
    let mutation: Mutation = serde_wasm_bindgen::from_value(mutation)?;
    dispatch_global_mutation(mutation)?;
    Ok(())
}

/// Plain-object snapshot `{msg, username}` of the current state.
#[wasm_bindgen(js_name = getState)]
pub fn get_state() -> Result<JsValue, JsValue> {
    let state = with_store(|store| store.state().clone())?;
    Ok(serde_wasm_bindgen::to_value(&state)?)
}

/// Hydrate the store with a full state object. Subscribers are not called.
#[wasm_bindgen(js_name = replaceState)]
pub fn replace_state(state: JsValue) -> Result<(), JsValue> {
    let state: StoreState = serde_wasm_bindgen::from_value(state)?;
    with_store_mut(|store| store.replace_state(state.clone()))?;

    // Like commits, a failed save keeps the in-memory state.
    let config = store_config();
    if config.persist {
        if let Err(e) = storage::save_state(&state, &config.storage_key) {
            store_log!(warn, "Failed to save replaced state: {}", e);
        }
    }
    Ok(())
}

/// Register `callback(mutation, state)`; returns an id for `unsubscribe`.
#[wasm_bindgen]
pub fn subscribe(callback: js_sys::Function) -> Result<u32, JsValue> {
    let id = with_store_mut(|store| {
        store.subscribe(Box::new(move |mutation: &Mutation, state: &StoreState| {
            let args = (
                serde_wasm_bindgen::to_value(mutation),
                serde_wasm_bindgen::to_value(state),
            );
            match args {
                (Ok(mutation), Ok(state)) => {
                    if let Err(e) = callback.call2(&JsValue::NULL, &mutation, &state) {
                        store_log!(error, "Subscriber threw: {:?}", e);
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    store_log!(error, "Failed to hand state to subscriber: {}", e);
                }
            }
        }))
    })?;
    Ok(id.as_u32())
}

#[wasm_bindgen]
pub fn unsubscribe(id: u32) -> Result<bool, JsValue> {
    Ok(with_store_mut(|store| store.unsubscribe(SubscriptionId::from_u32(id)))?)
}

#[wasm_bindgen(js_name = mutationNames)]
pub fn mutation_names() -> js_sys::Array {
    MUTATION_NAMES.iter().map(|name| JsValue::from_str(name)).collect()
}

/// Remove the persisted snapshot for the configured storage key.
#[wasm_bindgen(js_name = clearSavedState)]
pub fn clear_saved_state() -> Result<(), JsValue> {
    storage::clear_state(&store_config().storage_key)?;
    Ok(())
}

// Only `setUserName` carries data, and it must be a string. Anything handed
// to the other mutations is dropped.
fn string_payload(name: &str, payload: &JsValue) -> Result<Option<String>, StoreError> {
    if payload.is_undefined() || payload.is_null() {
        return Ok(None);
    }
    match payload.as_string() {
        Some(s) => Ok(Some(s)),
        None if name == "setUserName" => Err(StoreError::InvalidPayload {
            mutation: "setUserName",
            reason: "expected a string".to_string(),
        }),
        None => Ok(None),
    }
}

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_STORAGE_KEY, DEFAULT_USERNAME};

/// Runtime options for the store.
///
/// Every field is optional when the config comes from JavaScript; whatever is
/// missing falls back to [`StoreConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Write the state to `localStorage` after every commit and hydrate from
    /// it on init.
    pub persist: bool,
    pub storage_key: String,
    pub initial_username: String,
}

impl Default for StoreConfig {
    /// The storage key can be overridden at build time through the
    /// `STORE_STORAGE_KEY` environment variable.
    fn default() -> Self {
        Self {
            persist: false,
            storage_key: option_env!("STORE_STORAGE_KEY")
                .unwrap_or(DEFAULT_STORAGE_KEY)
                .to_string(),
            initial_username: DEFAULT_USERNAME.to_string(),
        }
    }
}

thread_local! {
    static STORE_CONFIG: RefCell<StoreConfig> = RefCell::new(StoreConfig::default());
}

/// Current configuration (cloned out of the thread-local).
pub fn store_config() -> StoreConfig {
    STORE_CONFIG.with(|cfg| cfg.borrow().clone())
}

pub fn set_store_config(config: StoreConfig) {
    STORE_CONFIG.with(|cfg| *cfg.borrow_mut() = config);
}

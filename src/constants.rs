// Initial state of a fresh store
pub const DEFAULT_GREETING: &str = "Hello ";
pub const DEFAULT_USERNAME: &str = "";

// Persistence
pub const DEFAULT_STORAGE_KEY: &str = "greeting-store:state";

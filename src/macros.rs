//! Logging macros used throughout the store.

/// Log a formatted line to the browser console at the given level
/// (`debug`, `warn` or `error`).
///
/// Off the `wasm32` target there is no console to talk to, so the macro only
/// type-checks its arguments. That keeps the reducers testable with a plain
/// `cargo test`.
///
/// ```rust,ignore
/// store_log!(debug, "commit {}", mutation.name());
/// store_log!(warn, "failed to persist state: {}", err);
/// ```
#[macro_export]
macro_rules! store_log {
    (debug, $($arg:tt)+) => {
        $crate::__store_console!(debug_1, $($arg)+)
    };
    (warn, $($arg:tt)+) => {
        $crate::__store_console!(warn_1, $($arg)+)
    };
    (error, $($arg:tt)+) => {
        $crate::__store_console!(error_1, $($arg)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __store_console {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(target_arch = "wasm32")]
        {
            ::web_sys::console::$level(&format!($($arg)+).into());
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = || format!($($arg)+);
        }
    }};
}

//! FILENAME: core/engine/src/logging.rs
//! PURPOSE: Category logging macros shared by every crate in the workspace.
//! CONTEXT: The category is passed as the `log` target, so the sink installed by
//! the service layer can print `seq|level|category|message` lines.

#[doc(hidden)]
pub use log;

/// Builds the message for an ENTER trace line.
pub fn enter_message(func_name: &str, params: &str) -> String {
    if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    }
}

/// Builds the message for an EXIT trace line.
pub fn exit_message(func_name: &str, result: &str) -> String {
    if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    }
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::warn!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::log::error!(target: $cat, $($arg)*)
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::log::debug!(target: $cat, "{}", $crate::logging::enter_message($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::log::debug!(
            target: $cat,
            "{}",
            $crate::logging::enter_message($func, &format!($($arg)*))
        )
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::log::debug!(target: $cat, "{}", $crate::logging::exit_message($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::log::debug!(
            target: $cat,
            "{}",
            $crate::logging::exit_message($func, &format!($($arg)*))
        )
    };
}

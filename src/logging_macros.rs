//! Formatting macros over [`Logger`](crate::Logger).
//!
//! The message is passed to the logger as `format_args!`, so it is only
//! rendered when the level is enabled. Disabled calls are still counted.
//!
//! The macros are prefixed with `relay_` to avoid collision with the `log`
//! crate's identically named macros.
//!
//! ```rust,ignore
//! let logger = logrelay::Logger::new();
//! relay_info!(logger, "listening on port {}", 8080);
//! ```

#[macro_export]
macro_rules! relay_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, ::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! relay_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::relay_log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! relay_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::relay_log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! relay_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::relay_log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! relay_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::relay_log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! relay_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::relay_log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

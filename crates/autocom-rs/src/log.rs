use alloc::format;
use alloc::string::String;

/// Trait for structs that provide metadata for logging
pub trait LogMetadata {
    fn meta(&self) -> String;
}

/// Identifies the side and handle a log line is about.
pub struct LogContext {
    pub side: &'static str,
    pub handle: u16,
}

impl LogContext {
    pub const fn rx(handle: u16) -> Self {
        Self { side: "rx", handle }
    }

    pub const fn tx(handle: u16) -> Self {
        Self { side: "tx", handle }
    }

    pub const fn group(handle: u16) -> Self {
        Self { side: "group", handle }
    }
}

impl LogMetadata for LogContext {
    fn meta(&self) -> String {
        format!("{}={}", self.side, self.handle)
    }
}

// =============================================
// Logging Macros (namespaced under crate::log)
// =============================================

// ===== com_info! =====
macro_rules! com_info {
    (ctx: $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::info!(concat!("[COM {}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::info!(concat!("[COM] ", $fmt) $(, $($arg)+)?);
    }};
}

// ===== com_warn! =====
macro_rules! com_warn {
    (ctx: $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::warn!(concat!("[COM {}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::warn!(concat!("[COM] ", $fmt) $(, $($arg)+)?);
    }};
}

// ===== com_error! =====
macro_rules! com_error {
    (ctx: $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::error!(concat!("[COM {}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::error!(concat!("[COM] ", $fmt) $(, $($arg)+)?);
    }};
}

// ===== com_debug! =====
macro_rules! com_debug {
    (ctx: $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::debug!(concat!("[COM {}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::debug!(concat!("[COM] ", $fmt) $(, $($arg)+)?);
    }};
}

// ===== com_trace! =====
macro_rules! com_trace {
    (ctx: $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::trace!(concat!("[COM {}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::trace!(concat!("[COM] ", $fmt) $(, $($arg)+)?);
    }};
}

// Re-export macros for use in other files
pub(crate) use com_debug;
pub(crate) use com_error;
pub(crate) use com_info;
pub(crate) use com_trace;
pub(crate) use com_warn;

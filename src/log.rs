//! A simple logging utility for emitting messages based on severity levels.

use std::sync::atomic::{AtomicU8, Ordering};
use std::{env, mem, time};

/// Source of the log message.
const SOURCE: &str = "tcp";

/// Environment variable consulted by [init_from_env].
pub const LOG_ENV: &str = "TCP_LOG";

#[cfg(debug_assertions)]
static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Debug as u8);
#[cfg(not(debug_assertions))]
static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Logs a message at the [Level::Error] level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {{
        if $crate::log::enabled($crate::log::Level::Error) {
            $crate::log::log($crate::log::Level::Error, format!($($arg)+));
        }
    }};
}

/// Logs a message at the [Level::Warn] level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {{
        if $crate::log::enabled($crate::log::Level::Warn) {
            $crate::log::log($crate::log::Level::Warn, format!($($arg)+));
        }
    }};
}

/// Logs a message at the [Level::Info] level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {{
        if $crate::log::enabled($crate::log::Level::Info) {
            $crate::log::log($crate::log::Level::Info, format!($($arg)+));
        }
    }};
}

/// Logs a message at the [Level::Debug] level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {{
        if $crate::log::enabled($crate::log::Level::Debug) {
            $crate::log::log($crate::log::Level::Debug, format!($($arg)+));
        }
    }};
}

/// Severity levels for log messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Disables all logging when used as the maximum level.
    Off = 0,
    /// Designates very serious errors.
    Error = 1,
    /// Designates hazardous situations.
    Warn = 2,
    /// Designates useful information.
    Info = 3,
    /// Designates lower priority information.
    Debug = 4,
}

impl Level {
    fn from_u8(val: u8) -> Self {
        match val {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            _ => Level::Debug,
        }
    }

    /// Parses a level name (`off`, `error`, `warn`, `info`, `debug`),
    /// ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Level::Off),
            "error" => Some(Level::Error),
            "warn" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            _ => None,
        }
    }
}

/// Sets the most verbose level that will be emitted.
pub fn set_max_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the most verbose level that will be emitted.
pub fn max_level() -> Level {
    Level::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

/// Initializes the maximum level from the `TCP_LOG` environment variable,
/// leaving the current level untouched if it is unset or unrecognized.
pub fn init_from_env() {
    if let Some(level) = env::var(LOG_ENV).ok().as_deref().and_then(Level::parse) {
        set_max_level(level);
    }
}

/// Returns `true` if messages at `level` should be emitted.
#[inline]
pub fn enabled(level: Level) -> bool {
    level != Level::Off && level <= max_level()
}

/// Logs a message with the specified severity level.
///
/// - [Level::Info] and [Level::Debug] messages are printed to `stdout`.
/// - [Level::Warn] and [Level::Error] messages are printed to `stderr`.
///
/// The log message will include a timestamp, severity level, and the source of
/// the log (`tcp`).
pub fn log(level: Level, msg: impl std::fmt::Display) {
    let now = time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let time = now as libc::time_t;
    let mut tm: libc::tm = unsafe { mem::zeroed() };

    // SAFETY: both pointers are valid for the duration of the call and
    // `localtime_r` does not retain them.
    let res = unsafe { libc::localtime_r(&time, &mut tm) };

    let timestamp = if res.is_null() {
        "UNKNOWN".to_string()
    } else {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            tm.tm_year + 1900,
            tm.tm_mon + 1,
            tm.tm_mday,
            tm.tm_hour,
            tm.tm_min,
            tm.tm_sec
        )
    };

    match level {
        Level::Off => {}
        Level::Error => {
            eprintln!(
                "[\x1b[1;37m{timestamp}\x1b[0m] \x1b[1;31mERROR\x1b[0m [\x1b[1;37m{SOURCE}\x1b[0m] {msg}"
            );
        }
        Level::Warn => {
            eprintln!(
                "[\x1b[1;37m{timestamp}\x1b[0m] \x1b[1;33mWARN \x1b[0m [\x1b[1;37m{SOURCE}\x1b[0m] {msg}"
            );
        }
        Level::Info => {
            println!(
                "[\x1b[1;37m{timestamp}\x1b[0m] \x1b[1;32mINFO \x1b[0m [\x1b[1;37m{SOURCE}\x1b[0m] {msg}"
            );
        }
        Level::Debug => {
            println!(
                "[\x1b[1;37m{timestamp}\x1b[0m] \x1b[1;34mDEBUG\x1b[0m [\x1b[1;37m{SOURCE}\x1b[0m] {msg}"
            );
        }
    }
}

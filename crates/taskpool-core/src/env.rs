//! Environment variable helpers
//!
//! Small parsing wrappers used by the runtime configuration. All taskpool
//! variables carry the `TP_` prefix.

use std::str::FromStr;

/// Parse an environment variable as `T`, falling back to `default` when
/// the variable is unset or fails to parse.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read an environment variable as a boolean.
///
/// "1", "true", "yes" and "on" (case-insensitive) count as true; any other
/// set value is false, and an unset variable yields the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

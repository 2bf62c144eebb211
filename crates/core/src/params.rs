//! Helpers for reading stage parameters out of a JSON object.
//!
//! Stage parameter structs are built from loosely-typed JSON (CLI `--params`,
//! config files, the WASM host). These helpers never fail: a missing key or
//! a value of the wrong type falls back to the supplied default.

use serde_json::Value;

/// Extracts an `f64` from `params[name]`, returning `default` if missing,
/// of the wrong type, or not finite.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params
        .get(name)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Extracts a `usize` from `params[name]`, returning `default` unless the
/// value is a non-negative integer.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extracts a `u64` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_u64(params: &Value, name: &str, default: u64) -> u64 {
    params.get(name).and_then(Value::as_u64).unwrap_or(default)
}

/// Extracts a `bool` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

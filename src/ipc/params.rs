use crate::clock::{self, FixedClock, SystemClock};
use crate::config::CampusConfig;
use crate::ipc::error::ParamError;
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;

fn present<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    params.get(key).filter(|v| !v.is_null())
}

fn decode<T: DeserializeOwned>(key: &str, v: &serde_json::Value) -> Result<T, ParamError> {
    T::deserialize(v).map_err(|e| ParamError::invalid(key, e.to_string()))
}

pub fn required<T: DeserializeOwned>(params: &serde_json::Value, key: &str) -> Result<T, ParamError> {
    let v = present(params, key).ok_or_else(|| ParamError::Missing(key.to_string()))?;
    decode(key, v)
}

pub fn optional<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, ParamError> {
    present(params, key).map(|v| decode(key, v)).transpose()
}

/// Like [`optional`], but `""` and `"all"` (any case) also mean "no constraint".
pub fn optional_filter<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, ParamError> {
    if let Some(s) = present(params, key).and_then(|v| v.as_str()) {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
    }
    optional(params, key)
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, ParamError> {
    optional::<String>(params, key)
}

/// Decodes a list of records, naming the offending element on failure.
pub fn required_list<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, ParamError> {
    let v = present(params, key).ok_or_else(|| ParamError::Missing(key.to_string()))?;
    let Some(items) = v.as_array() else {
        return Err(ParamError::invalid(key, "must be an array"));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            T::deserialize(item)
                .map_err(|e| ParamError::invalid(&format!("{}[{}]", key, i), e.to_string()))
        })
        .collect()
}

/// The instant a request is evaluated at: `params.now` (epoch millis) when
/// given, otherwise the system clock, sampled once.
pub fn request_now(
    config: &CampusConfig,
    params: &serde_json::Value,
) -> Result<DateTime<FixedOffset>, ParamError> {
    let offset = config.offset();
    match optional::<i64>(params, "now")? {
        Some(millis) => {
            let clock = FixedClock::from_millis(millis)
                .ok_or_else(|| ParamError::invalid("now", "epoch millis out of range"))?;
            Ok(clock::local_now(&clock, offset))
        }
        None => Ok(clock::local_now(&SystemClock, offset)),
    }
}

//! Shared DTO helpers.

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field from an explicit `null` in PATCH bodies.
///
/// Pair with `#[serde(default)]`: absent gives `None`, `null` gives
/// `Some(None)`, a value gives `Some(Some(value))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

//! Driver namespace mapping.
//!
//! Drivers see their own keys without the `Driver/` segment:
//!
//! | driver key      | canonical key            |
//! |-----------------|--------------------------|
//! | `Poll`          | `Driver/Poll`            |
//! | `Writable/Poll` | `Writable/Driver/Poll`   |

use crate::config::store::{CanonicalStore, DRIVER_PREFIX, WRITABLE_DRIVER_PREFIX, WRITABLE_PREFIX};

/// Canonical key for a key from the driver's own defaults.
pub fn canonical_driver_key(driver_key: &str) -> String {
    match driver_key.strip_prefix(WRITABLE_PREFIX) {
        Some(rest) => format!("{}{}", WRITABLE_DRIVER_PREFIX, rest),
        None => format!("{}{}", DRIVER_PREFIX, driver_key),
    }
}

/// Driver-visible key for a canonical key, or `None` outside the driver
/// namespace.
pub fn driver_key(canonical_key: &str) -> Option<String> {
    if let Some(rest) = canonical_key.strip_prefix(DRIVER_PREFIX) {
        Some(rest.to_string())
    } else {
        canonical_key
            .strip_prefix(WRITABLE_DRIVER_PREFIX)
            .map(|rest| format!("{}{}", WRITABLE_PREFIX, rest))
    }
}

/// Build the driver's configuration map from the canonical store.
///
/// The result is always rebuilt from scratch.
pub fn split_driver_config(store: &CanonicalStore) -> CanonicalStore {
    store
        .iter()
        .filter_map(|(key, value)| driver_key(key).map(|k| (k, value.clone())))
        .collect()
}

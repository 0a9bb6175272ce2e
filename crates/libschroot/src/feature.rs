//! Registry of compile-time capabilities.
//!
//! Components register the features they provide once at startup; the
//! registry is append-only and read by `--version` output.

use std::collections::BTreeMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

static FEATURES: Lazy<Mutex<BTreeMap<String, String>>> =
    Lazy::new(|| Mutex::new(BTreeMap::new()));

/// Register a feature. Re-registering an existing name is a no-op.
pub fn register(name: &str, description: &str) {
    let mut features = FEATURES.lock().expect("feature registry poisoned");
    features
        .entry(name.to_string())
        .or_insert_with(|| description.to_string());
}

/// A sorted snapshot of all registered features.
pub fn snapshot() -> Vec<(String, String)> {
    let features = FEATURES.lock().expect("feature registry poisoned");
    features
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_snapshot() {
        register("TEST_SNAPSHOT", "Support for testing the registry");
        register("TEST_SNAPSHOT", "A different description is ignored");

        let features = snapshot();
        let found = features
            .iter()
            .find(|(name, _)| name == "TEST_SNAPSHOT")
            .expect("registered feature present");
        assert_eq!(found.1, "Support for testing the registry");
    }
}

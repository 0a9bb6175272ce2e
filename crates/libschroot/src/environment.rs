//! Process environment as a mutable key/value map.

use std::collections::BTreeMap;
use std::ffi::CString;

use regex::Regex;

/// The variables stripped from the caller's environment unless a chroot
/// overrides the filter. Matching names are removed.
pub const DEFAULT_FILTER: &str = "^(BASH_ENV|CDPATH|ENV|HOSTALIASES|IFS|KRB5_CONFIG\
|KRBCONFDIR|KRBTKFILE|KRB_CONF|LD_.*|LOCALDOMAIN|NLSPATH|PATH_LOCALE\
|RES_OPTIONS|TERMINFO|TERMINFO_DIRS|TERMPATH)$";

/// A sorted map of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    pub fn from_process() -> Self {
        let mut env = Self::new();
        for (key, value) in std::env::vars() {
            env.add(key, value);
        }
        env
    }

    pub fn add<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into this environment, overriding existing keys.
    pub fn merge(&mut self, other: &Environment) {
        for (key, value) in other.iter() {
            self.add(key, value);
        }
    }

    /// Remove every variable whose name matches `filter`.
    pub fn strip(&mut self, filter: &Regex) {
        self.vars.retain(|key, _| !filter.is_match(key));
    }

    /// Render as `KEY=VALUE` C strings for execve(2).
    pub fn to_exec(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| CString::new(format!("{k}={v}")).ok())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Self::new();
        for (key, value) in iter {
            env.add(key, value);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Environment {
        Environment::from_iter([
            ("TERM", "wy50"),
            ("SHELL", "/bin/sh"),
            ("USER", "root"),
            ("LD_PRELOAD", "libinject.so"),
            ("COLUMNS", "80"),
        ])
    }

    #[test]
    fn add_and_get() {
        let mut env = Environment::new();
        env.add("MOUNT_LOCATION", "/srv/chroot/sid");
        assert_eq!(env.get("MOUNT_LOCATION"), Some("/srv/chroot/sid"));
        assert!(env.get("MISSING").is_none());
    }

    #[test]
    fn default_filter_strips_dangerous_variables() {
        let mut env = sample();
        env.strip(&Regex::new(DEFAULT_FILTER).unwrap());
        assert!(!env.contains("LD_PRELOAD"));
        assert!(env.contains("TERM"));
        assert!(env.contains("USER"));
    }

    #[test]
    fn custom_filter() {
        let mut env = sample();
        env.strip(&Regex::new("^(COLUMNS|TERM)$").unwrap());
        assert!(!env.contains("COLUMNS"));
        assert!(!env.contains("TERM"));
        assert!(env.contains("SHELL"));
    }

    #[test]
    fn merge_overrides() {
        let mut env = sample();
        let extra = Environment::from_iter([("USER", "nobody"), ("HOME", "/")]);
        env.merge(&extra);
        assert_eq!(env.get("USER"), Some("nobody"));
        assert_eq!(env.get("HOME"), Some("/"));
    }

    #[test]
    fn exec_rendering_is_sorted() {
        let env = Environment::from_iter([("B", "2"), ("A", "1")]);
        let rendered = env.to_exec();
        assert_eq!(rendered[0].to_str().unwrap(), "A=1");
        assert_eq!(rendered[1].to_str().unwrap(), "B=2");
    }
}

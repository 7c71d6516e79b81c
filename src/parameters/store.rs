//! Flat key/value settings store
//!
//! The host persists one opaque string; this store gives it sectioned
//! key/value structure with typed, defaulted accessors. Parsing never
//! fails: unrecognizable lines are skipped and missing or malformed values
//! fall back to the caller's default, so corrupted storage degrades to a
//! default-configured job rather than a dead one.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Sectioned string key/value store with an ini-like text codec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsStore {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text form. Never fails; lines that are neither a
    /// `[section]` header nor a `key=value` pair are ignored.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::new();
        let mut section = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_string();
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    store.set(&section, key.trim(), value.trim());
                }
                None => log::warn!("ignoring malformed settings line: {:?}", line),
            }
        }
        store
    }

    /// Encode to the text form accepted by [`SettingsStore::parse`].
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (section, entries) in &self.sections {
            if !section.is_empty() {
                out.push_str(&format!("[{}]\n", section));
            }
            for (key, value) in entries {
                out.push_str(&format!("{}={}\n", key, value));
            }
        }
        out
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Display) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Typed accessor with a default: missing keys return the default
    /// silently, present-but-unparsable values return it with a warning.
    pub fn get_or<T: FromStr>(&self, section: &str, key: &str, default: T) -> T {
        match self.get(section, key) {
            None => default,
            Some(raw) => match raw.parse() {
                Ok(value) => value,
                Err(_) => {
                    log::warn!(
                        "settings value [{}] {}={:?} failed to parse, using default",
                        section,
                        key,
                        raw
                    );
                    default
                }
            },
        }
    }

    /// String accessor; the sentinel value `"None"` reads as absent.
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut store = SettingsStore::new();
        store.set("Default", "Speed", 30.5);
        store.set("Default", "Paused", true);
        store.set("Default", "Name", "Drone A");

        let parsed = SettingsStore::parse(&store.encode());
        assert_eq!(parsed.get_or("Default", "Speed", 0.0), 30.5);
        assert_eq!(parsed.get_or("Default", "Paused", false), true);
        assert_eq!(parsed.get("Default", "Name"), Some("Drone A"));
    }

    #[test]
    fn test_parse_never_fails() {
        let store = SettingsStore::parse("[Job\nnot a pair\n===\n[Ok]\nkey=value");
        assert_eq!(store.get("Ok", "key"), Some("value"));
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let store = SettingsStore::parse("[Job]\nSpeed=fast\n");
        assert_eq!(store.get_or("Job", "Speed", 30.0), 30.0);
    }

    #[test]
    fn test_missing_key_uses_default() {
        let store = SettingsStore::new();
        assert_eq!(store.get_or("Job", "Missing", 7), 7);
        assert_eq!(store.get_string("Job", "Missing", "None"), "None");
    }

    #[test]
    fn test_values_may_contain_equals() {
        let store = SettingsStore::parse("[Job]\nPath=a@1 2 3;x=y\n");
        assert_eq!(store.get("Job", "Path"), Some("a@1 2 3;x=y"));
    }
}

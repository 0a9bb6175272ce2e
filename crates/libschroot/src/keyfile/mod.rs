//! INI-style keyfile parsing and generation.
//!
//! The grammar is the one shared by chroot definitions and session files:
//! UTF-8 text, `#` comments, `[section]` headers, `key=value` entries with
//! optional `key[lang]=value` locale tagging, booleans spelled
//! `true|false|yes|no|0|1` and lists separated by commas. Parse errors carry
//! the file and line they were found at.

pub mod value;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub use value::{ParseValue, ValueError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub line: usize,
    items: BTreeMap<String, Item>,
}

impl Section {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }
}

/// A parsed keyfile: a sorted map of sections, each a sorted map of keys.
#[derive(Debug, Clone, Default)]
pub struct Keyfile {
    path: PathBuf,
    sections: BTreeMap<String, Section>,
}

impl Keyfile {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            sections: BTreeMap::new(),
        }
    }

    /// Parse `path` as a keyfile.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| Error::ConfigParse {
            file: path.to_path_buf(),
            line: 0,
            reason: err.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Parse in-memory `content`, attributing errors to `source`.
    pub fn parse(content: &str, source: &Path) -> Result<Self> {
        let mut keyfile = Self {
            path: source.to_path_buf(),
            sections: BTreeMap::new(),
        };
        let mut current: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let lineno = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| keyfile.parse_error(
                    lineno,
                    "invalid section header".to_string(),
                ))?;
                if name.is_empty() {
                    return Err(keyfile.parse_error(lineno, "empty section name".to_string()));
                }
                if keyfile.sections.contains_key(name) {
                    return Err(keyfile.parse_error(
                        lineno,
                        format!("duplicate section '{name}'"),
                    ));
                }
                keyfile.sections.insert(
                    name.to_string(),
                    Section {
                        line: lineno,
                        items: BTreeMap::new(),
                    },
                );
                current = Some(name.to_string());
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| keyfile.parse_error(
                lineno,
                format!("expected 'key=value', got '{line}'"),
            ))?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(keyfile.parse_error(lineno, "empty key".to_string()));
            }

            let section_name = current.clone().ok_or_else(|| keyfile.parse_error(
                lineno,
                format!("key '{key}' outside any section"),
            ))?;
            let section = keyfile
                .sections
                .get_mut(&section_name)
                .expect("current section exists");
            if section.items.contains_key(key) {
                return Err(Error::ConfigParse {
                    file: source.to_path_buf(),
                    line: lineno,
                    reason: format!("duplicate key '{key}' in section '{section_name}'"),
                });
            }
            section.items.insert(
                key.to_string(),
                Item {
                    value: value.to_string(),
                    line: lineno,
                },
            );
        }

        Ok(keyfile)
    }

    fn parse_error(&self, line: usize, reason: String) -> Error {
        Error::ConfigParse {
            file: self.path.clone(),
            line,
            reason,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Raw string value of `key` in `section`.
    pub fn get_value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .items
            .get(key)
            .map(|item| item.value.as_str())
    }

    /// Typed value of `key` in `section`; `None` if absent, an error with
    /// file and line context if present but malformed.
    pub fn get<T: ParseValue>(&self, section: &str, key: &str) -> Result<Option<T>> {
        let Some(sect) = self.sections.get(section) else {
            return Ok(None);
        };
        let Some(item) = sect.items.get(key) else {
            return Ok(None);
        };
        T::parse_value(&item.value)
            .map(Some)
            .map_err(|err| Error::ConfigParse {
                file: self.path.clone(),
                line: item.line,
                reason: format!("key '{key}': {err}"),
            })
    }

    /// Comma-separated list value with whitespace trimming; empty elements
    /// are dropped.
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_value(section, key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A possibly locale-tagged string: the plain key wins, otherwise any
    /// `key[lang]` variant is returned.
    pub fn get_localized(&self, section: &str, key: &str) -> Option<&str> {
        if let Some(value) = self.get_value(section, key) {
            return Some(value);
        }
        let sect = self.sections.get(section)?;
        let prefix = format!("{key}[");
        sect.items
            .iter()
            .find(|(name, _)| name.starts_with(&prefix) && name.ends_with(']'))
            .map(|(_, item)| item.value.as_str())
    }

    pub fn set_value<V: ToString>(&mut self, section: &str, key: &str, value: V) {
        let sect = self.sections.entry(section.to_string()).or_default();
        sect.items.insert(
            key.to_string(),
            Item {
                value: value.to_string(),
                line: 0,
            },
        );
    }

    pub fn set_list(&mut self, section: &str, key: &str, values: &[String]) {
        if !values.is_empty() {
            self.set_value(section, key, values.join(","));
        }
    }

    /// Render as text, sections and keys in sorted order.
    pub fn serialise(&self) -> String {
        let mut out = String::new();
        for (index, (name, section)) in self.sections.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (key, item) in &section.items {
                out.push_str(&format!("{key}={}\n", item.value));
            }
        }
        out
    }

    /// Write to `path` atomically: write a temporary sibling, then rename
    /// over the target.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(self.serialise().as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        };
        write().map_err(|err| Error::SessionWrite {
            path: path.to_path_buf(),
            source: err,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;

    use super::*;
    use crate::error::ErrorKind;

    const SAMPLE: &str = "\
# Test configuration
[sid]
type=directory
directory=/srv/chroot/sid
description=Debian unstable
description[fr]=Debian instable
groups=sbuild , users,
run-setup-scripts=true
priority=3
";

    fn parse(content: &str) -> Result<Keyfile> {
        Ok(Keyfile::parse(content, Path::new("test.conf"))?)
    }

    #[test]
    fn parses_sections_and_keys() -> Result<()> {
        let keyfile = parse(SAMPLE)?;
        assert!(keyfile.has_section("sid"));
        assert_eq!(keyfile.get_value("sid", "type"), Some("directory"));
        assert_eq!(
            keyfile.get_value("sid", "directory"),
            Some("/srv/chroot/sid")
        );
        Ok(())
    }

    #[test]
    fn typed_getters() -> Result<()> {
        let keyfile = parse(SAMPLE)?;
        assert_eq!(keyfile.get::<bool>("sid", "run-setup-scripts")?, Some(true));
        assert_eq!(keyfile.get::<i32>("sid", "priority")?, Some(3));
        assert_eq!(keyfile.get::<i32>("sid", "missing")?, None);
        Ok(())
    }

    #[test]
    fn typed_getter_reports_line() -> Result<()> {
        let keyfile = parse("[c]\nrun-setup-scripts=maybe\n")?;
        let err = keyfile.get::<bool>("c", "run-setup-scripts").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigParse);
        assert!(err.to_string().contains("line 2"));
        Ok(())
    }

    #[test]
    fn list_values_trim_whitespace() -> Result<()> {
        let keyfile = parse(SAMPLE)?;
        assert_eq!(keyfile.get_list("sid", "groups"), vec!["sbuild", "users"]);
        assert!(keyfile.get_list("sid", "missing").is_empty());
        Ok(())
    }

    #[test]
    fn locale_tagged_keys() -> Result<()> {
        let keyfile = parse(SAMPLE)?;
        assert_eq!(
            keyfile.get_localized("sid", "description"),
            Some("Debian unstable")
        );
        let keyfile = parse("[c]\ndescription[fr]=seulement\n")?;
        assert_eq!(keyfile.get_localized("c", "description"), Some("seulement"));
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        for (content, needle) in [
            ("[unterminated\n", "section header"),
            ("key=value\n", "outside any section"),
            ("[a]\nnot a pair\n", "key=value"),
            ("[a]\nk=1\nk=2\n", "duplicate key"),
            ("[a]\n[a]\n", "duplicate section"),
        ] {
            let err = Keyfile::parse(content, Path::new("bad.conf")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigParse, "{content}");
            assert!(err.to_string().contains(needle), "{content}: {err}");
        }
    }

    #[test]
    fn load_then_serialise_is_idempotent() -> Result<()> {
        let keyfile = parse(SAMPLE)?;
        let first = keyfile.serialise();
        let again = parse(&first)?;
        assert_eq!(again.serialise(), first);
        Ok(())
    }

    #[test]
    fn atomic_write_replaces_target() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("session");
        std::fs::write(&target, "stale")?;

        let mut keyfile = Keyfile::new();
        keyfile.set_value("s", "type", "directory");
        keyfile.write_atomic(&target)?;

        let reread = Keyfile::load(&target)?;
        assert_eq!(reread.get_value("s", "type"), Some("directory"));
        assert!(!target.with_extension("tmp").exists());
        Ok(())
    }
}

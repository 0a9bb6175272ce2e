//! Loading and indexing of chroot definitions.
//!
//! A configuration is a single keyfile or a directory of keyfiles. Each
//! section becomes one chroot; aliases form a secondary index that must be
//! injective into the name set. A file either loads completely or
//! registers nothing.

use std::collections::BTreeMap;
use std::path::Path;

use crate::chroot::{Chroot, SessionFlags};
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;
use crate::session::Session;
use crate::util;

#[derive(Debug, Default)]
pub struct ConfigStore {
    chroots: BTreeMap<String, Chroot>,
    /// alias → canonical name.
    aliases: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every section of a single keyfile. All-or-nothing: a duplicate
    /// name or alias rejects the whole file.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let keyfile = Keyfile::load(path)?;
        let mut batch = Vec::new();

        for (section, _) in keyfile.sections() {
            if !util::is_valid_chroot_name(section) {
                return Err(Error::ConfigValidate {
                    file: path.to_path_buf(),
                    section: section.to_string(),
                    reason: "invalid chroot name".to_string(),
                });
            }

            let chroot = Chroot::from_keyfile(section, &keyfile, false)?;
            for alias in &chroot.aliases {
                if !util::is_valid_chroot_name(alias) {
                    return Err(Error::ConfigValidate {
                        file: path.to_path_buf(),
                        section: section.to_string(),
                        reason: format!("invalid alias '{alias}'"),
                    });
                }
            }

            for key in unused_keys(&chroot, &keyfile) {
                tracing::warn!(
                    file = %path.display(),
                    section,
                    key,
                    "unknown configuration key"
                );
            }

            batch.push(chroot);
        }

        // Snapshot-backed chroots also expose their writable source branch.
        let mut sources = Vec::new();
        for chroot in &batch {
            if chroot.session_flags().contains(SessionFlags::SOURCE) {
                sources.push(chroot.clone_source()?);
            }
        }
        batch.extend(sources);

        self.insert_batch(batch)
    }

    /// Load every keyfile in a configuration directory, sorted by name.
    /// Editor backups and hidden files are skipped.
    pub fn load_directory(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        let entries = std::fs::read_dir(dir)
            .map_err(|err| Error::Internal(format!("{}: {err}", dir.display())))?;

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| util::is_valid_session_name(name))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        for file in files {
            self.load_file(&file)?;
        }
        Ok(())
    }

    fn insert_batch(&mut self, batch: Vec<Chroot>) -> Result<()> {
        // Validate the whole batch against the store and itself before
        // registering anything.
        let mut new_names: BTreeMap<&str, &str> = BTreeMap::new();
        let mut new_aliases: BTreeMap<&str, &str> = BTreeMap::new();

        for chroot in &batch {
            let name = chroot.name.as_str();
            if let Some(first) = self.owner_of(name) {
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    first,
                    second: name.to_string(),
                });
            }
            if let Some(first) = new_names.get(name).or_else(|| new_aliases.get(name)) {
                return Err(Error::DuplicateName {
                    name: name.to_string(),
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
            new_names.insert(name, name);

            for alias in &chroot.aliases {
                let alias = alias.as_str();
                if let Some(first) = self.owner_of(alias) {
                    return Err(Error::DuplicateName {
                        name: alias.to_string(),
                        first,
                        second: name.to_string(),
                    });
                }
                if let Some(first) = new_names.get(alias).or_else(|| new_aliases.get(alias)) {
                    return Err(Error::DuplicateName {
                        name: alias.to_string(),
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
                new_aliases.insert(alias, name);
            }
        }

        for chroot in batch {
            for alias in &chroot.aliases {
                self.aliases.insert(alias.clone(), chroot.name.clone());
            }
            self.chroots.insert(chroot.name.clone(), chroot);
        }
        Ok(())
    }

    /// The section owning `name`, as a name or as an alias.
    fn owner_of(&self, name: &str) -> Option<String> {
        if self.chroots.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases.get(name).cloned()
    }

    /// Resolve a chroot by name or alias.
    pub fn find(&self, name: &str) -> Option<&Chroot> {
        if let Some(chroot) = self.chroots.get(name) {
            return Some(chroot);
        }
        self.aliases
            .get(name)
            .and_then(|canonical| self.chroots.get(canonical))
    }

    /// Resolve like [`ConfigStore::find`], but also accept `session:<id>`
    /// references to live sessions.
    pub fn find_or_session(&self, name: &str) -> Result<Chroot> {
        if let Some(id) = name.strip_prefix("session:") {
            return Session::load(id).map(|session| session.chroot);
        }
        self.find(name)
            .cloned()
            .ok_or_else(|| Error::UnknownChroot(name.to_string()))
    }

    pub fn chroots(&self) -> impl Iterator<Item = &Chroot> {
        self.chroots.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.chroots.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chroots.is_empty()
    }
}

/// The section keys no facet and no envelope field consumes.
pub fn unused_keys(chroot: &Chroot, keyfile: &Keyfile) -> Vec<String> {
    let used = chroot.used_keys();
    let Some(section) = keyfile.section(&chroot.name) else {
        return Vec::new();
    };

    section
        .keys()
        .filter(|key| {
            let base = key.split('[').next().unwrap_or(key);
            let wildcard_custom =
                key.starts_with("custom.") && used.iter().any(|u| *u == "custom.*");
            !(used.iter().any(|u| *u == *key || *u == base) || wildcard_custom)
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;

    use super::*;
    use crate::error::ErrorKind;

    fn write_config(dir: &Path, name: &str, content: &str) -> Result<std::path::PathBuf> {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path)?;
        file.write_all(content.as_bytes())?;
        Ok(path)
    }

    #[test]
    fn loads_and_resolves_aliases() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            "schroot.conf",
            "[sid]\ntype=directory\ndirectory=/srv/chroot/sid\naliases=unstable,default\n",
        )?;

        let mut config = ConfigStore::new();
        config.load_file(&path)?;

        assert!(config.find("sid").is_some());
        assert_eq!(config.find("unstable").unwrap().name, "sid");
        assert_eq!(config.find("default").unwrap().name, "sid");
        assert!(config.find("stretch").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_alias_rejects_the_whole_file() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            "schroot.conf",
            "[sid]\ntype=directory\ndirectory=/srv/a\naliases=unstable\n\
             \n[rawhide]\ntype=directory\ndirectory=/srv/b\naliases=unstable\n",
        )?;

        let mut config = ConfigStore::new();
        let err = config.load_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        let message = err.to_string();
        assert!(message.contains("sid") && message.contains("rawhide"), "{message}");
        assert!(config.is_empty());
        Ok(())
    }

    #[test]
    fn alias_colliding_with_a_name_is_rejected() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            "schroot.conf",
            "[sid]\ntype=directory\ndirectory=/srv/a\n\
             \n[other]\ntype=directory\ndirectory=/srv/b\naliases=sid\n",
        )?;

        let mut config = ConfigStore::new();
        assert_eq!(
            config.load_file(&path).unwrap_err().kind(),
            ErrorKind::DuplicateName
        );
        Ok(())
    }

    #[test]
    fn invalid_chroot_name_is_a_validation_error() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            "schroot.conf",
            "[.hidden]\ntype=directory\ndirectory=/srv/a\n",
        )?;

        let mut config = ConfigStore::new();
        assert_eq!(
            config.load_file(&path).unwrap_err().kind(),
            ErrorKind::ConfigValidate
        );
        Ok(())
    }

    #[test]
    fn snapshot_chroots_register_their_source() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            "schroot.conf",
            "[snap]\ntype=btrfs-snapshot\nbtrfs-source-subvolume=/srv/chroot/snap\n\
             btrfs-snapshot-directory=/srv/chroot/snapshots\n",
        )?;

        let mut config = ConfigStore::new();
        config.load_file(&path)?;
        assert!(config.find("snap").is_some());
        let source = config.find("source:snap").expect("source chroot");
        assert_eq!(source.chroot_type(), "directory");
        Ok(())
    }

    #[test]
    fn directory_loader_reads_fragments_in_order() -> Result<()> {
        crate::init();
        let dir = tempfile::tempdir()?;
        write_config(dir.path(), "10-sid", "[sid]\ntype=directory\ndirectory=/srv/a\n")?;
        write_config(
            dir.path(),
            "20-stable",
            "[stable]\ntype=directory\ndirectory=/srv/b\n",
        )?;
        // Skipped: not a valid fragment name.
        write_config(dir.path(), ".hidden", "[x]\ntype=directory\ndirectory=/srv/c\n")?;

        let mut config = ConfigStore::new();
        config.load_directory(dir.path())?;
        assert_eq!(config.names(), vec!["sid", "stable"]);
        Ok(())
    }

    #[test]
    fn unused_keys_are_reported() -> Result<()> {
        crate::init();
        let keyfile = Keyfile::parse(
            "[sid]\ntype=directory\ndirectory=/srv/a\nfrobnicate=yes\n",
            Path::new("t.conf"),
        )?;
        let chroot = Chroot::from_keyfile("sid", &keyfile, false)?;
        assert_eq!(unused_keys(&chroot, &keyfile), vec!["frobnicate"]);
        Ok(())
    }

    #[test]
    fn locale_tagged_description_is_not_unused() -> Result<()> {
        crate::init();
        let keyfile = Keyfile::parse(
            "[sid]\ntype=directory\ndirectory=/srv/a\ndescription[fr]=instable\n",
            Path::new("t.conf"),
        )?;
        let chroot = Chroot::from_keyfile("sid", &keyfile, false)?;
        assert!(unused_keys(&chroot, &keyfile).is_empty());
        Ok(())
    }
}

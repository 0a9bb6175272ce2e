//! Persisted chroot sessions.
//!
//! A session is a chroot clone with a session facet, serialised to the
//! sessions directory as a keyfile named after the session id. Creation is
//! exclusive (at most one creator per id); updates are atomic under
//! rename; reads validate strictly and never observe torn values.

pub mod engine;
pub mod lock;

use std::fs::OpenOptions;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use crate::chroot::facet::session::Session as SessionFacet;
use crate::chroot::Chroot;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;
use crate::paths;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub chroot: Chroot,
}

impl Session {
    /// A fresh session id: a random 128-bit token rendered as hex.
    pub fn generate_id() -> String {
        format!("{:016x}{:016x}", fastrand::u64(..), fastrand::u64(..))
    }

    pub fn file_path(id: &str) -> PathBuf {
        paths::session_dir().join(id)
    }

    pub fn exists(id: &str) -> bool {
        Self::file_path(id).is_file()
    }

    /// Persist a newly cloned session chroot. Exclusive creation of the
    /// session file guarantees at most one successful creator per id.
    pub fn create(chroot: Chroot) -> Result<Self> {
        let id = chroot.name.clone();
        let path = Self::file_path(&id);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| Error::SessionCreate {
                id: id.clone(),
                source: err,
            })?;
        }

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| {
                let reason = if err.kind() == IoErrorKind::AlreadyExists {
                    std::io::Error::new(err.kind(), "session id already in use")
                } else {
                    err
                };
                Error::SessionCreate {
                    id: id.clone(),
                    source: reason,
                }
            })?;

        let session = Self { id, chroot };
        session.save()?;
        Ok(session)
    }

    /// Rehydrate a session from the sessions directory.
    pub fn load(id: &str) -> Result<Self> {
        let path = Self::file_path(id);
        if !path.is_file() {
            return Err(Error::SessionMissing(id.to_string()));
        }

        let keyfile = Keyfile::load(&path)?;
        let section = keyfile
            .sections()
            .next()
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| Error::ConfigValidate {
                file: path.clone(),
                section: id.to_string(),
                reason: "session file contains no section".to_string(),
            })?;

        let chroot = Chroot::from_keyfile(&section, &keyfile, true)?;
        Ok(Self {
            id: id.to_string(),
            chroot,
        })
    }

    /// Write the session keyfile atomically.
    pub fn save(&self) -> Result<()> {
        let mut keyfile = Keyfile::new();
        self.chroot.to_keyfile(&mut keyfile);
        keyfile.write_atomic(&Self::file_path(&self.id))
    }

    pub fn delete(&self) -> Result<()> {
        std::fs::remove_file(Self::file_path(&self.id)).map_err(|err| Error::SessionWrite {
            path: Self::file_path(&self.id),
            source: err,
        })
    }

    /// The ids of every persisted session.
    pub fn all_ids() -> Result<Vec<String>> {
        let dir = paths::session_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&dir)
            .map_err(|err| Error::Internal(format!("{}: {err}", dir.display())))?;
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.ends_with(".tmp"))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn facet(&self) -> Option<&SessionFacet> {
        self.chroot.facet::<SessionFacet>()
    }

    pub fn original_name(&self) -> String {
        self.facet()
            .map(|f| f.original_name.clone())
            .unwrap_or_else(|| self.chroot.name.clone())
    }

    pub fn selected_name(&self) -> String {
        self.facet()
            .map(|f| f.selected_name.clone())
            .unwrap_or_else(|| self.chroot.name.clone())
    }

    pub fn mount_device(&self) -> Option<String> {
        self.facet().and_then(|f| f.mount_device.clone())
    }

    pub fn set_mount_device(&mut self, device: &str) {
        if let Some(facet) = self.chroot.facet_mut::<SessionFacet>() {
            facet.mount_device = Some(device.to_string());
        }
    }

    pub fn purged(&self) -> bool {
        self.facet().map(|f| f.purged).unwrap_or(false)
    }

    pub fn set_purged(&mut self, purged: bool) {
        if let Some(facet) = self.chroot.facet_mut::<SessionFacet>() {
            facet.purged = purged;
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serial_test::serial;

    use super::*;
    use crate::error::ErrorKind;

    fn with_session_dir<T>(test: impl FnOnce() -> T) -> T {
        let dir = tempfile::tempdir().expect("tempdir");
        std::env::set_var("SCHROOT_SESSION_DIR", dir.path());
        let result = test();
        std::env::remove_var("SCHROOT_SESSION_DIR");
        result
    }

    fn session_chroot(id: &str) -> Chroot {
        crate::init();
        let keyfile = Keyfile::parse(
            "[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n",
            std::path::Path::new("t.conf"),
        )
        .unwrap();
        let chroot = Chroot::from_keyfile("sid", &keyfile, false).unwrap();
        chroot.clone_session(id, "sid", "joe", false).unwrap()
    }

    #[test]
    fn generated_ids_are_hex_tokens() {
        let id = Session::generate_id();
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(id, Session::generate_id());
    }

    #[test]
    #[serial]
    fn create_save_load_round_trip() -> Result<()> {
        with_session_dir(|| -> Result<()> {
            let session = Session::create(session_chroot("0123abcd"))?;
            assert!(Session::exists("0123abcd"));

            let loaded = Session::load("0123abcd")?;
            assert_eq!(loaded.id, "0123abcd");
            assert_eq!(loaded.original_name(), "sid");
            assert!(loaded.chroot.is_session());
            assert_eq!(loaded.chroot.chroot_type(), "directory");

            session.delete()?;
            assert!(!Session::exists("0123abcd"));
            Ok(())
        })
    }

    #[test]
    #[serial]
    fn duplicate_creation_is_rejected() {
        with_session_dir(|| {
            Session::create(session_chroot("dupe0001")).unwrap();
            let err = Session::create(session_chroot("dupe0001")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SessionCreate);
        })
    }

    #[test]
    #[serial]
    fn missing_session_is_reported() {
        with_session_dir(|| {
            let err = Session::load("absent").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SessionMissing);
        })
    }

    #[test]
    #[serial]
    fn mount_device_is_persisted() -> Result<()> {
        with_session_dir(|| -> Result<()> {
            let mut session = Session::create(session_chroot("dev00001"))?;
            session.set_mount_device("/dev/vg/snap");
            session.save()?;

            let loaded = Session::load("dev00001")?;
            assert_eq!(loaded.mount_device().as_deref(), Some("/dev/vg/snap"));
            Ok(())
        })
    }

    #[test]
    #[serial]
    fn all_ids_lists_sessions() -> Result<()> {
        with_session_dir(|| -> Result<()> {
            Session::create(session_chroot("aaaa0000"))?;
            Session::create(session_chroot("bbbb0000"))?;
            assert_eq!(Session::all_ids()?, vec!["aaaa0000", "bbbb0000"]);
            Ok(())
        })
    }
}

//! A chroot on a btrfs subvolume, entered through a copy-on-write
//! snapshot created per session. No locking is needed: snapshot creation
//! is atomic on the filesystem side.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::directory::Directory;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "btrfs-snapshot";

#[derive(Debug, Clone, Default)]
pub struct BtrfsSnapshot {
    /// The source subvolume.
    pub source_subvolume: String,
    /// Where per-session snapshots are created.
    pub snapshot_directory: String,
    /// The per-session snapshot path, set when a session is cloned.
    pub snapshot_name: Option<String>,
}

impl BtrfsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for BtrfsSnapshot {
    fn name(&self) -> &'static str {
        FACET_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn storage(&self) -> Option<&dyn Storage> {
        Some(self)
    }

    fn used_keys(&self) -> &'static [&'static str] {
        &[
            "btrfs-source-subvolume",
            "btrfs-snapshot-directory",
            "btrfs-snapshot-name",
        ]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(source) = keyfile.get_value(section, "btrfs-source-subvolume") {
            self.source_subvolume = source.to_string();
        }
        if let Some(directory) = keyfile.get_value(section, "btrfs-snapshot-directory") {
            self.snapshot_directory = directory.to_string();
        }
        self.snapshot_name = keyfile
            .get_value(section, "btrfs-snapshot-name")
            .map(str::to_string);
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "btrfs-source-subvolume", &self.source_subvolume);
        keyfile.set_value(section, "btrfs-snapshot-directory", &self.snapshot_directory);
        if let Some(name) = &self.snapshot_name {
            keyfile.set_value(section, "btrfs-snapshot-name", name);
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_BTRFS_SOURCE_SUBVOLUME", self.source_subvolume.clone());
        if let Some(name) = &self.snapshot_name {
            env.add("CHROOT_BTRFS_SNAPSHOT_NAME", name.clone());
        }
    }

    fn clone_session_setup(&mut self, _original_name: &str, session_id: &str) {
        self.snapshot_name = Some(format!("{}/{session_id}", self.snapshot_directory));
    }

    fn clone_source_setup(&self, _original: &Chroot, clone: &mut Chroot) -> Result<()> {
        clone.remove_facet(FACET_NAME);
        clone.add_facet(Box::new(Directory::with_directory(&self.source_subvolume)));
        Ok(())
    }
}

impl Storage for BtrfsSnapshot {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.source_subvolume)
    }

    fn setup(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let snapshot = self
            .snapshot_name
            .clone()
            .ok_or_else(|| Error::Internal("no snapshot name on session".to_string()))?;

        ctx.run(
            "btrfs",
            &[
                "subvolume".to_string(),
                "snapshot".to_string(),
                self.source_subvolume.clone(),
                snapshot.clone(),
            ],
            |status| Error::Snapshot {
                device: snapshot.clone(),
                status,
            },
        )?;
        ctx.release
            .push(ReleaseAction::DeleteSubvolume(PathBuf::from(&snapshot)));

        let target = ctx.mount_location.clone();
        ctx.run(
            "mount",
            &[
                "--bind".to_string(),
                snapshot.clone(),
                target.display().to_string(),
            ],
            |status| Error::Mount {
                target: target.clone(),
                status,
            },
        )?;
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        ctx.mount_device = Some(snapshot);
        Ok(())
    }

    fn teardown(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let snapshot = ctx
            .mount_device
            .clone()
            .or_else(|| self.snapshot_name.clone());
        if let Some(snapshot) = snapshot {
            ctx.release
                .push(ReleaseAction::DeleteSubvolume(PathBuf::from(snapshot)));
        }
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        Ok(())
    }
}

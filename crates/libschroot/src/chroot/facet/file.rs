//! A chroot unpacked from a file archive for each session, optionally
//! repacked on session end.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "file";

#[derive(Debug, Clone, Default)]
pub struct FileArchive {
    pub file: String,
    /// Repack the (possibly modified) tree into the archive on session end.
    pub repack: bool,
}

impl FileArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for FileArchive {
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
        &["file", "file-repack"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(file) = keyfile.get_value(section, "file") {
            self.file = file.to_string();
        }
        if let Some(repack) = keyfile.get::<bool>(section, "file-repack")? {
            self.repack = repack;
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "file", &self.file);
        if self.repack {
            keyfile.set_value(section, "file-repack", "true");
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_FILE", self.file.clone());
        env.add("CHROOT_FILE_REPACK", if self.repack { "true" } else { "false" });
    }
}

impl Storage for FileArchive {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.file)
    }

    fn lock_path(&self, _chroot: &Chroot) -> Option<PathBuf> {
        Some(PathBuf::from(&self.file))
    }

    fn setup(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let target = ctx.mount_location.clone();
        ctx.run(
            "tar",
            &[
                "-xf".to_string(),
                self.file.clone(),
                "-C".to_string(),
                target.display().to_string(),
            ],
            |status| Error::Mount {
                target: target.clone(),
                status,
            },
        )?;
        ctx.release
            .push(ReleaseAction::RemoveDirectory(ctx.mount_location.clone()));
        Ok(())
    }

    fn teardown(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        if self.repack {
            let location = ctx.mount_location.clone();
            ctx.run(
                "tar",
                &[
                    "-cf".to_string(),
                    self.file.clone(),
                    "-C".to_string(),
                    location.display().to_string(),
                    ".".to_string(),
                ],
                |status| Error::Mount {
                    target: location.clone(),
                    status,
                },
            )?;
        }
        ctx.release
            .push(ReleaseAction::RemoveDirectory(ctx.mount_location.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::test::TestSyscall;
    use std::path::Path;

    #[test]
    fn setup_unpacks_and_registers_removal() {
        let chroot = Chroot::new("tarball");
        let mut facet = FileArchive::new();
        facet.file = "/srv/chroot/sid.tar".to_string();

        let syscall = TestSyscall::default();
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));
        facet.setup(&chroot, &mut ctx).unwrap();

        let commands = syscall.commands();
        assert_eq!(commands[0].0, "tar");
        assert_eq!(commands[0].1[0], "-xf");
        assert_eq!(ctx.release.len(), 1);
    }

    #[test]
    fn archive_is_the_lock_target() {
        let chroot = Chroot::new("tarball");
        let mut facet = FileArchive::new();
        facet.file = "/srv/chroot/sid.tar".to_string();
        assert_eq!(
            facet.lock_path(&chroot),
            Some(PathBuf::from("/srv/chroot/sid.tar"))
        );
    }
}

//! A chroot in an existing directory, bind-mounted into the mount
//! location so sessions and setup scripts see a detachable root.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "directory";

#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub directory: String,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(directory: &str) -> Self {
        Self {
            directory: directory.to_string(),
        }
    }
}

impl Facet for Directory {
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
        &["directory"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(directory) = keyfile.get_value(section, "directory") {
            self.directory = directory.to_string();
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "directory", &self.directory);
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_DIRECTORY", self.directory.clone());
    }
}

impl Storage for Directory {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.directory)
    }

    fn setup(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let target = ctx.mount_location.clone();
        ctx.run(
            "mount",
            &[
                "--bind".to_string(),
                self.directory.clone(),
                target.display().to_string(),
            ],
            |status| Error::Mount {
                target: target.clone(),
                status,
            },
        )?;
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        Ok(())
    }

    fn teardown(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::test::TestSyscall;
    use std::path::Path;

    #[test]
    fn setup_bind_mounts_and_registers_release() {
        let chroot = Chroot::new("sid");
        let facet = Directory::with_directory("/srv/chroot/sid");
        let syscall = TestSyscall::default();
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));

        facet.setup(&chroot, &mut ctx).unwrap();

        let commands = syscall.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, "mount");
        assert_eq!(commands[0].1[0], "--bind");
        assert_eq!(ctx.release.len(), 1);
    }

    #[test]
    fn failed_mount_surfaces_mount_error() {
        let chroot = Chroot::new("sid");
        let facet = Directory::with_directory("/srv/chroot/sid");
        let syscall = TestSyscall::failing_on("mount");
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));

        let err = facet.setup(&chroot, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Mount);
        assert!(ctx.release.is_empty());
    }
}

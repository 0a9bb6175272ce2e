//! A chroot in a filesystem image, attached to a loop device and mounted
//! for the duration of a session.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::mountable;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "loopback";

#[derive(Debug, Clone, Default)]
pub struct Loopback {
    pub file: String,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for Loopback {
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
        &["file"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(file) = keyfile.get_value(section, "file") {
            self.file = file.to_string();
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "file", &self.file);
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_FILE", self.file.clone());
    }
}

impl Storage for Loopback {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.file)
    }

    fn lock_path(&self, _chroot: &Chroot) -> Option<PathBuf> {
        Some(PathBuf::from(&self.file))
    }

    fn setup(&self, chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let device = match ctx.syscall.run_command_output(
            "losetup",
            &[
                "--find".to_string(),
                "--show".to_string(),
                self.file.clone(),
            ],
        ) {
            Ok((0, output)) => output.trim().to_string(),
            Ok(status) => {
                return Err(Error::Mount {
                    target: PathBuf::from(&self.file),
                    status: status.0,
                })
            }
            Err(err) => {
                return Err(Error::Internal(format!("failed to run losetup: {err}")))
            }
        };
        if device.is_empty() {
            return Err(Error::Internal(
                "losetup reported no loop device".to_string(),
            ));
        }
        ctx.release.push(ReleaseAction::DetachLoop(device.clone()));

        let target = ctx.mount_location.clone();
        let mut args = mountable::mount_option_args(chroot);
        args.push(device.clone());
        args.push(target.display().to_string());
        ctx.run("mount", &args, |status| Error::Mount {
            target: target.clone(),
            status,
        })?;
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        ctx.mount_device = Some(device);
        Ok(())
    }

    fn teardown(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        if let Some(device) = ctx.mount_device.clone() {
            ctx.release.push(ReleaseAction::DetachLoop(device));
        }
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::test::TestSyscall;
    use std::path::Path;

    fn facet() -> Loopback {
        Loopback {
            file: "/srv/chroot/sid.img".to_string(),
        }
    }

    #[test]
    fn setup_attaches_then_mounts() {
        let chroot = Chroot::new("img");
        let syscall = TestSyscall::default();
        syscall.set_output("losetup", "/dev/loop3\n");
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));

        facet().setup(&chroot, &mut ctx).unwrap();

        let commands = syscall.commands();
        assert_eq!(commands[0].0, "losetup");
        assert_eq!(commands[1].0, "mount");
        assert_eq!(ctx.mount_device.as_deref(), Some("/dev/loop3"));
        // Two acquisitions, two registered releases.
        assert_eq!(ctx.release.len(), 2);
    }

    #[test]
    fn mount_failure_leaves_the_loop_release_registered() {
        let chroot = Chroot::new("img");
        let syscall = TestSyscall::failing_on("mount");
        syscall.set_output("losetup", "/dev/loop3\n");
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));

        let err = facet().setup(&chroot, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Mount);
        // The loop device was attached before the failure, so exactly its
        // release remains for the rollback to run.
        assert_eq!(ctx.release.len(), 1);
    }
}

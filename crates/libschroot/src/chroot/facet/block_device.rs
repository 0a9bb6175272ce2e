//! A chroot on a block device, mounted for the duration of a session.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::mountable;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "block-device";

#[derive(Debug, Clone, Default)]
pub struct BlockDevice {
    pub device: String,
}

impl BlockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(device: &str) -> Self {
        Self {
            device: device.to_string(),
        }
    }
}

impl Facet for BlockDevice {
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
        &["device"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(device) = keyfile.get_value(section, "device") {
            self.device = device.to_string();
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "device", &self.device);
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_DEVICE", self.device.clone());
    }
}

impl Storage for BlockDevice {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.device)
    }

    fn lock_path(&self, _chroot: &Chroot) -> Option<PathBuf> {
        Some(PathBuf::from(&self.device))
    }

    fn setup(&self, chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let target = ctx.mount_location.clone();
        let mut args = mountable::mount_option_args(chroot);
        args.push(self.device.clone());
        args.push(target.display().to_string());
        ctx.run("mount", &args, |status| Error::Mount {
            target: target.clone(),
            status,
        })?;
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        ctx.mount_device = Some(self.device.clone());
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
    fn mount_uses_configured_options() {
        crate::init();
        let keyfile = Keyfile::parse(
            "[dev]\ntype=block-device\ndevice=/dev/sdb1\nmount-options=ro,noatime\n",
            Path::new("t.conf"),
        )
        .unwrap();
        // mount-options installs a mountable facet alongside the storage.
        let chroot = Chroot::from_keyfile("dev", &keyfile, false).unwrap();

        let syscall = TestSyscall::default();
        let mut ctx = SetupContext::new(&syscall, "abc", Path::new("/run/mount/abc"));
        chroot.storage().unwrap().setup(&chroot, &mut ctx).unwrap();

        let commands = syscall.commands();
        assert_eq!(commands[0].0, "mount");
        assert!(commands[0].1.contains(&"-o".to_string()));
        assert_eq!(ctx.mount_device.as_deref(), Some("/dev/sdb1"));
    }
}

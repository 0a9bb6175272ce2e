//! A chroot on an LVM logical volume, entered through a snapshot LV
//! created per session. The source branch is the origin volume itself.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;
use crate::util;

use super::super::Chroot;
use super::block_device::BlockDevice;
use super::mountable;
use super::storage::{ReleaseAction, SetupContext, Storage};
use super::Facet;

pub const FACET_NAME: &str = "lvm-snapshot";

#[derive(Debug, Clone, Default)]
pub struct LvmSnapshot {
    /// The origin logical volume device.
    pub device: String,
    /// The per-session snapshot device, set when a session is cloned.
    pub snapshot_device: Option<String>,
    /// Extra arguments for lvcreate, e.g. `-L 2G`.
    pub snapshot_options: Vec<String>,
}

impl LvmSnapshot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for LvmSnapshot {
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
        &["device", "lvm-snapshot-device", "lvm-snapshot-options"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(device) = keyfile.get_value(section, "device") {
            self.device = device.to_string();
        }
        self.snapshot_device = keyfile
            .get_value(section, "lvm-snapshot-device")
            .map(str::to_string);
        if let Some(options) = keyfile.get_value(section, "lvm-snapshot-options") {
            self.snapshot_options = util::split_string(options, " \t");
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "device", &self.device);
        if let Some(snapshot) = &self.snapshot_device {
            keyfile.set_value(section, "lvm-snapshot-device", snapshot);
        }
        if !self.snapshot_options.is_empty() {
            keyfile.set_value(
                section,
                "lvm-snapshot-options",
                self.snapshot_options.join(" "),
            );
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_DEVICE", self.device.clone());
        if let Some(snapshot) = &self.snapshot_device {
            env.add("CHROOT_LVM_SNAPSHOT_NAME", util::basename(snapshot));
        }
    }

    fn clone_session_setup(&mut self, _original_name: &str, session_id: &str) {
        self.snapshot_device = Some(format!("{}-{session_id}", self.device));
    }

    fn clone_source_setup(&self, _original: &Chroot, clone: &mut Chroot) -> Result<()> {
        clone.remove_facet(FACET_NAME);
        clone.add_facet(Box::new(BlockDevice::with_device(&self.device)));
        Ok(())
    }
}

impl Storage for LvmSnapshot {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.device)
    }

    fn lock_path(&self, _chroot: &Chroot) -> Option<PathBuf> {
        Some(PathBuf::from(&self.device))
    }

    fn setup(&self, chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let snapshot = self
            .snapshot_device
            .clone()
            .ok_or_else(|| Error::Internal("no snapshot device on session".to_string()))?;

        let mut args = vec![
            "--snapshot".to_string(),
            "--name".to_string(),
            util::basename(&snapshot),
        ];
        args.extend(self.snapshot_options.iter().cloned());
        args.push(self.device.clone());
        ctx.run("lvcreate", &args, |status| Error::Snapshot {
            device: snapshot.clone(),
            status,
        })?;
        ctx.release
            .push(ReleaseAction::RemoveSnapshot(snapshot.clone()));

        let target = ctx.mount_location.clone();
        let mut mount_args = mountable::mount_option_args(chroot);
        mount_args.push(snapshot.clone());
        mount_args.push(target.display().to_string());
        ctx.run("mount", &mount_args, |status| Error::Mount {
            target: target.clone(),
            status,
        })?;
        ctx.release.push(ReleaseAction::Unmount(ctx.mount_location.clone()));
        ctx.mount_device = Some(snapshot);
        Ok(())
    }

    fn teardown(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        let snapshot = ctx
            .mount_device
            .clone()
            .or_else(|| self.snapshot_device.clone());
        if let Some(snapshot) = snapshot {
            ctx.release.push(ReleaseAction::RemoveSnapshot(snapshot));
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

    fn session_facet() -> LvmSnapshot {
        let mut facet = LvmSnapshot::new();
        facet.device = "/dev/vg/chroot_sid".to_string();
        facet.snapshot_options = vec!["-L".to_string(), "2G".to_string()];
        facet.clone_session_setup("sid", "0123abcd");
        facet
    }

    #[test]
    fn session_clone_derives_the_snapshot_device() {
        let facet = session_facet();
        assert_eq!(
            facet.snapshot_device.as_deref(),
            Some("/dev/vg/chroot_sid-0123abcd")
        );
    }

    #[test]
    fn setup_snapshots_then_mounts() {
        let chroot = Chroot::new("sid");
        let facet = session_facet();
        let syscall = TestSyscall::default();
        let mut ctx = SetupContext::new(&syscall, "0123abcd", Path::new("/run/mount/0123abcd"));

        facet.setup(&chroot, &mut ctx).unwrap();

        let commands = syscall.commands();
        assert_eq!(commands[0].0, "lvcreate");
        assert!(commands[0].1.contains(&"--snapshot".to_string()));
        assert!(commands[0].1.contains(&"chroot_sid-0123abcd".to_string()));
        assert_eq!(commands[1].0, "mount");
        assert_eq!(ctx.release.len(), 2);
        assert_eq!(
            ctx.mount_device.as_deref(),
            Some("/dev/vg/chroot_sid-0123abcd")
        );
    }

    #[test]
    fn failed_lvcreate_is_a_snapshot_error_with_no_release() {
        let chroot = Chroot::new("sid");
        let facet = session_facet();
        let syscall = TestSyscall::failing_on("lvcreate");
        let mut ctx = SetupContext::new(&syscall, "0123abcd", Path::new("/run/mount/0123abcd"));

        let err = facet.setup(&chroot, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Snapshot);
        assert!(ctx.release.is_empty());
    }
}

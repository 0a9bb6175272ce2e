//! The storage contract and the release stack.
//!
//! Storage facets acquire resources (mounts, loop devices, snapshots) in
//! order, registering one release action per acquisition. The engine runs
//! the stack in reverse on both the success and the failure path, so a
//! failure inside any acquisition step rolls back everything before it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::syscall::Syscall;

use super::super::Chroot;
use super::Facet;

/// Implemented by every storage facet.
pub trait Storage: Facet {
    /// The on-host source of this storage: a directory, an archive, a
    /// block device or a backing file.
    fn path(&self, chroot: &Chroot) -> PathBuf;

    /// The file to take the advisory lock on for the duration of setup and
    /// teardown. `None` for storage that needs no serialisation.
    fn lock_path(&self, _chroot: &Chroot) -> Option<PathBuf> {
        None
    }

    /// Acquire the storage, pushing one release action per acquisition.
    fn setup(&self, _chroot: &Chroot, _ctx: &mut SetupContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Release the storage of a persisted session during `end`: derive the
    /// release actions from the session record instead of a live stack.
    fn teardown(&self, _chroot: &Chroot, _ctx: &mut SetupContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// State shared between the engine and a storage facet during setup and
/// teardown of one session.
pub struct SetupContext<'a> {
    pub syscall: &'a dyn Syscall,
    pub session_id: String,
    pub mount_location: PathBuf,
    /// Storage-specific handle recorded on the session: a snapshot LV, a
    /// loop device.
    pub mount_device: Option<String>,
    pub release: ReleaseStack,
}

impl<'a> SetupContext<'a> {
    pub fn new(syscall: &'a dyn Syscall, session_id: &str, mount_location: &Path) -> Self {
        Self {
            syscall,
            session_id: session_id.to_string(),
            mount_location: mount_location.to_path_buf(),
            mount_device: None,
            release: ReleaseStack::default(),
        }
    }

    /// Run an external program, mapping a spawn failure or non-zero exit
    /// through `on_status`.
    pub fn run(
        &self,
        program: &str,
        args: &[String],
        on_status: impl FnOnce(i32) -> Error,
    ) -> Result<()> {
        match self.syscall.run_command(program, args) {
            Ok(0) => Ok(()),
            Ok(status) => Err(on_status(status)),
            Err(err) => Err(Error::Internal(format!("failed to run {program}: {err}"))),
        }
    }
}

/// A reversible acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseAction {
    /// `umount <path>`.
    Unmount(PathBuf),
    /// `losetup -d <device>`.
    DetachLoop(String),
    /// `lvremove -f <device>`.
    RemoveSnapshot(String),
    /// `btrfs subvolume delete <path>`.
    DeleteSubvolume(PathBuf),
    /// Remove an unpacked tree.
    RemoveDirectory(PathBuf),
}

impl ReleaseAction {
    pub fn run(&self, syscall: &dyn Syscall) -> Result<()> {
        match self {
            ReleaseAction::Unmount(path) => run_status(
                syscall,
                "umount",
                &[path.display().to_string()],
                |status| Error::Umount {
                    target: path.clone(),
                    status,
                },
            ),
            ReleaseAction::DetachLoop(device) => run_status(
                syscall,
                "losetup",
                &["-d".to_string(), device.clone()],
                |status| Error::Snapshot {
                    device: device.clone(),
                    status,
                },
            ),
            ReleaseAction::RemoveSnapshot(device) => run_status(
                syscall,
                "lvremove",
                &["-f".to_string(), device.clone()],
                |status| Error::Snapshot {
                    device: device.clone(),
                    status,
                },
            ),
            ReleaseAction::DeleteSubvolume(path) => run_status(
                syscall,
                "btrfs",
                &[
                    "subvolume".to_string(),
                    "delete".to_string(),
                    path.display().to_string(),
                ],
                |status| Error::Snapshot {
                    device: path.display().to_string(),
                    status,
                },
            ),
            ReleaseAction::RemoveDirectory(path) => std::fs::remove_dir_all(path)
                .map_err(|err| Error::Internal(format!("{}: {err}", path.display()))),
        }
    }
}

fn run_status(
    syscall: &dyn Syscall,
    program: &str,
    args: &[String],
    on_status: impl FnOnce(i32) -> Error,
) -> Result<()> {
    match syscall.run_command(program, args) {
        Ok(0) => Ok(()),
        Ok(status) => Err(on_status(status)),
        Err(err) => Err(Error::Internal(format!("failed to run {program}: {err}"))),
    }
}

/// Acquisitions awaiting release, run strictly LIFO.
#[derive(Debug, Default)]
pub struct ReleaseStack {
    actions: Vec<ReleaseAction>,
}

impl ReleaseStack {
    pub fn push(&mut self, action: ReleaseAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Discard the stack without running it: the resources outlive this
    /// invocation, as for a persisted session left mounted.
    pub fn commit(&mut self) {
        self.actions.clear();
    }

    /// Release everything in reverse order. Failures are logged and the
    /// first one is returned; later releases still run, so one failed
    /// release never strands the rest.
    pub fn run_reverse(&mut self, syscall: &dyn Syscall) -> Option<Error> {
        let mut first_error = None;
        while let Some(action) = self.actions.pop() {
            if let Err(err) = action.run(syscall) {
                tracing::warn!(?action, %err, "release failed");
                first_error.get_or_insert(err);
            }
        }
        first_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::test::TestSyscall;

    #[test]
    fn release_runs_in_reverse_order() {
        let syscall = TestSyscall::default();
        let mut stack = ReleaseStack::default();
        stack.push(ReleaseAction::RemoveSnapshot("/dev/vg/snap".into()));
        stack.push(ReleaseAction::Unmount(PathBuf::from("/run/mount/abc")));

        assert!(stack.run_reverse(&syscall).is_none());
        let commands = syscall.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].0, "umount");
        assert_eq!(commands[1].0, "lvremove");
        assert!(stack.is_empty());
    }

    #[test]
    fn commit_discards_without_running() {
        let syscall = TestSyscall::default();
        let mut stack = ReleaseStack::default();
        stack.push(ReleaseAction::Unmount(PathBuf::from("/run/mount/abc")));
        stack.commit();
        assert!(stack.run_reverse(&syscall).is_none());
        assert!(syscall.commands().is_empty());
    }

    #[test]
    fn failed_release_does_not_strand_the_rest() {
        let syscall = TestSyscall::failing_on("umount");
        let mut stack = ReleaseStack::default();
        stack.push(ReleaseAction::RemoveSnapshot("/dev/vg/snap".into()));
        stack.push(ReleaseAction::Unmount(PathBuf::from("/run/mount/abc")));

        let err = stack.run_reverse(&syscall).expect("umount failure surfaced");
        assert_eq!(err.kind(), crate::error::ErrorKind::Umount);
        // The snapshot removal after the failed unmount still ran.
        assert_eq!(syscall.commands().len(), 2);
    }
}

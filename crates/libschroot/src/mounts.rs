//! Mount table enumeration, for the listmounts helper and for unmounting
//! everything below a session root in the right order.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Mount points at or below `path`, deepest last in `/proc/mounts` order,
/// returned reversed so they can be unmounted front to back.
pub fn mounts_under(path: &Path) -> Result<Vec<PathBuf>> {
    let entries = procfs::mounts()
        .map_err(|err| Error::Internal(format!("failed to read mount table: {err}")))?;
    let mount_points = entries.into_iter().map(|entry| entry.fs_file);
    Ok(filter_mounts(mount_points, path))
}

fn filter_mounts(mount_points: impl Iterator<Item = String>, path: &Path) -> Vec<PathBuf> {
    let mut matching: Vec<PathBuf> = mount_points
        .map(PathBuf::from)
        .filter(|mount| mount.starts_with(path))
        .collect();
    matching.reverse();
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_prefix_and_reverses() {
        let table = [
            "/",
            "/proc",
            "/run/schroot/mount/abc",
            "/run/schroot/mount/abc/proc",
            "/run/schroot/mount/abc/sys",
            "/run/schroot/mount/abcdef",
        ]
        .into_iter()
        .map(str::to_string);

        let mounts = filter_mounts(table, Path::new("/run/schroot/mount/abc"));
        assert_eq!(
            mounts,
            vec![
                PathBuf::from("/run/schroot/mount/abc/sys"),
                PathBuf::from("/run/schroot/mount/abc/proc"),
                PathBuf::from("/run/schroot/mount/abc"),
            ]
        );
    }

    #[test]
    fn reads_the_system_mount_table() {
        let mounts = mounts_under(Path::new("/")).expect("mount table readable");
        assert!(!mounts.is_empty());
        assert!(mounts.iter().all(|m| m.starts_with("/")));
    }
}

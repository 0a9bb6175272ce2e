//! Filesystem locations used by the engine.
//!
//! Compile-time defaults, overridable through the environment so the whole
//! engine can be pointed at scratch directories.

use std::path::PathBuf;

const SYSCONF_DIR: &str = "/etc/schroot";
const SESSION_DIR: &str = "/var/lib/schroot/session";
const MOUNT_DIR: &str = "/run/schroot/mount";

fn from_env(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Configuration root, normally `/etc/schroot`.
pub fn sysconf_dir() -> PathBuf {
    from_env("SCHROOT_SYSCONF_DIR", SYSCONF_DIR)
}

/// The single-file configuration.
pub fn config_file() -> PathBuf {
    sysconf_dir().join("schroot.conf")
}

/// The configuration fragment directory.
pub fn chroot_dir() -> PathBuf {
    sysconf_dir().join("chroot.d")
}

/// The setup script directory for a script configuration profile.
pub fn setup_script_dir(profile: &str) -> PathBuf {
    sysconf_dir().join(profile).join("setup.d")
}

/// Where live sessions are persisted.
pub fn session_dir() -> PathBuf {
    from_env("SCHROOT_SESSION_DIR", SESSION_DIR)
}

/// Where session roots are made visible on the host.
pub fn mount_dir() -> PathBuf {
    from_env("SCHROOT_MOUNT_DIR", MOUNT_DIR)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn defaults() {
        std::env::remove_var("SCHROOT_SYSCONF_DIR");
        std::env::remove_var("SCHROOT_SESSION_DIR");
        assert_eq!(config_file(), PathBuf::from("/etc/schroot/schroot.conf"));
        assert_eq!(session_dir(), PathBuf::from("/var/lib/schroot/session"));
        assert_eq!(
            setup_script_dir("default"),
            PathBuf::from("/etc/schroot/default/setup.d")
        );
    }

    #[test]
    #[serial]
    fn environment_overrides() {
        std::env::set_var("SCHROOT_SESSION_DIR", "/tmp/sessions");
        assert_eq!(session_dir(), PathBuf::from("/tmp/sessions"));
        std::env::remove_var("SCHROOT_SESSION_DIR");
    }
}

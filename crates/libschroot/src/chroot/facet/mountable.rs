//! Mount behaviour shared by device-backed storage: extra mount options
//! and an optional location inside the mounted filesystem to use as the
//! chroot root.

use std::any::Any;

use crate::environment::Environment;
use crate::error::Result;
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::Facet;

pub const FACET_NAME: &str = "mountable";

#[derive(Debug, Clone, Default)]
pub struct Mountable {
    pub mount_options: Option<String>,
    /// Path of the chroot relative to the mount point of the filesystem.
    pub location: Option<String>,
}

impl Mountable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for Mountable {
    fn name(&self) -> &'static str {
        FACET_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn used_keys(&self) -> &'static [&'static str] {
        &["mount-options", "location"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        self.mount_options = keyfile
            .get_value(section, "mount-options")
            .map(str::to_string);
        self.location = keyfile.get_value(section, "location").map(str::to_string);
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        if let Some(options) = &self.mount_options {
            keyfile.set_value(section, "mount-options", options);
        }
        if let Some(location) = &self.location {
            keyfile.set_value(section, "location", location);
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        if let Some(options) = &self.mount_options {
            env.add("CHROOT_MOUNT_OPTIONS", options.clone());
        }
        if let Some(location) = &self.location {
            env.add("CHROOT_LOCATION", location.clone());
        }
    }
}

/// The `-o` arguments for mount(8), if any are configured.
pub fn mount_option_args(chroot: &Chroot) -> Vec<String> {
    chroot
        .facet::<Mountable>()
        .and_then(|m| m.mount_options.clone())
        .map(|options| vec!["-o".to_string(), options])
        .unwrap_or_default()
}

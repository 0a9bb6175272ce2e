//! The facet attached only to live sessions: who cloned the chroot, the
//! names involved, and the storage handle recorded during setup.

use std::any::Any;

use crate::environment::Environment;
use crate::error::Result;
use crate::keyfile::Keyfile;

use super::super::{Chroot, SessionFlags};
use super::Facet;

pub const FACET_NAME: &str = "session";

#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The chroot this session was cloned from.
    pub original_name: String,
    /// The name or alias the user selected.
    pub selected_name: String,
    /// The authenticated user the session was created for. Runtime only;
    /// every invocation re-authenticates the caller.
    pub user: String,
    pub root: bool,
    pub purged: bool,
    /// Snapshot LV, loop device or other storage handle for teardown.
    pub mount_device: Option<String>,
}

impl Session {
    pub fn new(original_name: &str, selected_name: &str) -> Self {
        Self {
            original_name: original_name.to_string(),
            selected_name: selected_name.to_string(),
            ..Self::default()
        }
    }
}

impl Facet for Session {
    fn name(&self) -> &'static str {
        FACET_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn session_flags(&self, _chroot: &Chroot) -> SessionFlags {
        SessionFlags::PURGE
    }

    fn used_keys(&self) -> &'static [&'static str] {
        &[
            "original-name",
            "selected-name",
            "session-purged",
            "mount-device",
        ]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(name) = keyfile.get_value(section, "original-name") {
            self.original_name = name.to_string();
        }
        if let Some(name) = keyfile.get_value(section, "selected-name") {
            self.selected_name = name.to_string();
        }
        if let Some(purged) = keyfile.get::<bool>(section, "session-purged")? {
            self.purged = purged;
        }
        self.mount_device = keyfile
            .get_value(section, "mount-device")
            .map(str::to_string);
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "original-name", &self.original_name);
        keyfile.set_value(section, "selected-name", &self.selected_name);
        keyfile.set_value(
            section,
            "session-purged",
            if self.purged { "true" } else { "false" },
        );
        if let Some(device) = &self.mount_device {
            keyfile.set_value(section, "mount-device", device);
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_ALIAS_NAME", self.selected_name.clone());
        if let Some(device) = &self.mount_device {
            env.add("CHROOT_MOUNT_DEVICE", device.clone());
        }
    }
}

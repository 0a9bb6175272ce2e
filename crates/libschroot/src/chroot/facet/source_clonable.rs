//! The ability to expose a read-write source branch of a snapshot-backed
//! chroot, with its own access policy.

use std::any::Any;

use crate::error::Result;
use crate::keyfile::Keyfile;

use super::super::{Chroot, SessionFlags};
use super::Facet;

pub const FACET_NAME: &str = "source-clonable";

#[derive(Debug, Clone, Default)]
pub struct SourceClonable {
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub root_users: Vec<String>,
    pub root_groups: Vec<String>,
}

impl SourceClonable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the source access policy to the derived source chroot.
    pub fn apply_policy(&self, source: &mut Chroot) {
        source.users = self.users.clone();
        source.groups = self.groups.clone();
        source.root_users = self.root_users.clone();
        source.root_groups = self.root_groups.clone();
    }
}

impl Facet for SourceClonable {
    fn name(&self) -> &'static str {
        FACET_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn session_flags(&self, chroot: &Chroot) -> SessionFlags {
        if chroot.is_session() {
            SessionFlags::empty()
        } else {
            SessionFlags::SOURCE
        }
    }

    fn used_keys(&self) -> &'static [&'static str] {
        &[
            "source-users",
            "source-groups",
            "source-root-users",
            "source-root-groups",
        ]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        self.users = keyfile.get_list(section, "source-users");
        self.groups = keyfile.get_list(section, "source-groups");
        self.root_users = keyfile.get_list(section, "source-root-users");
        self.root_groups = keyfile.get_list(section, "source-root-groups");
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_list(section, "source-users", &self.users);
        keyfile.set_list(section, "source-groups", &self.groups);
        keyfile.set_list(section, "source-root-users", &self.root_users);
        keyfile.set_list(section, "source-root-groups", &self.root_groups);
    }
}

//! A chroot located in an existing directory, with setup scripts and
//! session support disabled. Use the directory type if either is needed.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::Result;
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::storage::Storage;
use super::Facet;

pub const FACET_NAME: &str = "plain";

#[derive(Debug, Clone, Default)]
pub struct Plain {
    pub directory: String,
}

impl Plain {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for Plain {
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

impl Storage for Plain {
    fn path(&self, _chroot: &Chroot) -> PathBuf {
        PathBuf::from(&self.directory)
    }
}

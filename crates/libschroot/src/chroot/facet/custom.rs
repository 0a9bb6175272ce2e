//! A chroot whose storage behaviour is delegated entirely to the setup
//! scripts. Capability flags opt in to session and source support;
//! arbitrary `custom.*` keys are passed through to the scripts but each
//! one is reported, since nothing validates their meaning.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::Result;
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::storage::Storage;
use super::Facet;

pub const FACET_NAME: &str = "custom";

#[derive(Debug, Clone, Default)]
pub struct Custom {
    pub directory: Option<String>,
    pub session_cloneable: bool,
    pub source_cloneable: bool,
    /// Pass-through keys, preserved for serialisation.
    pub extra: Vec<(String, String)>,
}

impl Custom {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for Custom {
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
        &[
            "directory",
            "custom-session-cloneable",
            "custom-source-cloneable",
            "custom.*",
        ]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        self.directory = keyfile.get_value(section, "directory").map(str::to_string);
        if let Some(cloneable) = keyfile.get::<bool>(section, "custom-session-cloneable")? {
            self.session_cloneable = cloneable;
        }
        if let Some(cloneable) = keyfile.get::<bool>(section, "custom-source-cloneable")? {
            self.source_cloneable = cloneable;
        }

        if let Some(sect) = keyfile.section(section) {
            for key in sect.keys() {
                if let Some(rest) = key.strip_prefix("custom.") {
                    tracing::warn!(
                        section,
                        key,
                        "unvalidated custom key '{rest}' passed through to setup scripts"
                    );
                    if let Some(value) = keyfile.get_value(section, key) {
                        self.extra.push((key.to_string(), value.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        if let Some(directory) = &self.directory {
            keyfile.set_value(section, "directory", directory);
        }
        if self.session_cloneable {
            keyfile.set_value(section, "custom-session-cloneable", "true");
        }
        if self.source_cloneable {
            keyfile.set_value(section, "custom-source-cloneable", "true");
        }
        for (key, value) in &self.extra {
            keyfile.set_value(section, key, value);
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        // Pass-through keys become CHROOT_CUSTOM_<KEY> for the scripts.
        for (key, value) in &self.extra {
            let suffix = key
                .trim_start_matches("custom.")
                .to_uppercase()
                .replace(['-', '.'], "_");
            env.add(format!("CHROOT_CUSTOM_{suffix}"), value.clone());
        }
    }
}

impl Storage for Custom {
    fn path(&self, chroot: &Chroot) -> PathBuf {
        match &self.directory {
            Some(directory) => PathBuf::from(directory),
            None => chroot
                .mount_location
                .clone()
                .unwrap_or_else(|| PathBuf::from("/")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn custom_keys_are_collected_for_the_scripts() {
        let keyfile = Keyfile::parse(
            "[zfs]\ntype=custom\ncustom-session-cloneable=true\n\
             custom.zfs-dataset=tank/chroot\n",
            Path::new("t.conf"),
        )
        .unwrap();

        let mut facet = Custom::new();
        facet.set_keyfile("zfs", &keyfile).unwrap();
        assert!(facet.session_cloneable);
        assert_eq!(
            facet.extra,
            vec![("custom.zfs-dataset".to_string(), "tank/chroot".to_string())]
        );

        let mut env = Environment::new();
        facet.setup_env(&Chroot::new("zfs"), &mut env);
        assert_eq!(env.get("CHROOT_CUSTOM_ZFS_DATASET"), Some("tank/chroot"));
    }
}

//! Kernel execution domain support for chroots, e.g. running a 32-bit
//! chroot on a 64-bit host.

use std::any::Any;

use crate::error::{Error, Result};
use crate::keyfile::Keyfile;
use crate::personality::Persona;

use super::Facet;

pub const FACET_NAME: &str = "personality";

#[derive(Debug, Clone, Default)]
pub struct Personality {
    pub persona: Persona,
}

impl Personality {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Facet for Personality {
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
        &["personality"]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(value) = keyfile.get_value(section, "personality") {
            self.persona = value.parse().map_err(|err| Error::ConfigValidate {
                file: keyfile.path().to_path_buf(),
                section: section.to_string(),
                reason: format!("{err}"),
            })?;
        }
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        if self.persona != Persona::Undefined {
            keyfile.set_value(section, "personality", self.persona.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_the_persona() {
        let keyfile =
            Keyfile::parse("[c]\npersonality=linux32\n", Path::new("t.conf")).unwrap();
        let mut facet = Personality::new();
        facet.set_keyfile("c", &keyfile).unwrap();
        assert_eq!(facet.persona, Persona::Linux32);
    }

    #[test]
    fn unknown_persona_is_a_validation_error() {
        let keyfile = Keyfile::parse("[c]\npersonality=hurd\n", Path::new("t.conf")).unwrap();
        let mut facet = Personality::new();
        let err = facet.set_keyfile("c", &keyfile).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigValidate);
    }
}

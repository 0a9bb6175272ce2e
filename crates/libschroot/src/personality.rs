//! Process execution domain (personality) support.

use std::fmt;
use std::str::FromStr;

/// A kernel execution domain, settable before the command is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    /// Leave the execution domain alone.
    #[default]
    Undefined,
    /// PER_LINUX.
    Linux,
    /// PER_LINUX32, for 32-bit chroots on 64-bit hosts.
    Linux32,
}

/// The string was not a recognised persona name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("'{0}' is not a valid personality")]
pub struct InvalidPersona(pub String);

impl Persona {
    fn value(&self) -> Option<libc::c_ulong> {
        match self {
            Persona::Undefined => None,
            Persona::Linux => Some(0x0000),
            Persona::Linux32 => Some(0x0008),
        }
    }

    /// Apply the execution domain to the current process.
    pub fn apply(&self) -> std::io::Result<()> {
        let Some(value) = self.value() else {
            return Ok(());
        };
        // personality(2) only fails with EINVAL for unsupported domains.
        let ret = unsafe { libc::personality(value) };
        if ret < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
}

impl FromStr for Persona {
    type Err = InvalidPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undefined" => Ok(Persona::Undefined),
            "linux" => Ok(Persona::Linux),
            "linux32" => Ok(Persona::Linux32),
            other => Err(InvalidPersona(other.to_string())),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Persona::Undefined => "undefined",
            Persona::Linux => "linux",
            Persona::Linux32 => "linux32",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!("linux".parse(), Ok(Persona::Linux));
        assert_eq!("linux32".parse(), Ok(Persona::Linux32));
        assert_eq!("undefined".parse(), Ok(Persona::Undefined));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = "hurd".parse::<Persona>().unwrap_err();
        assert_eq!(err, InvalidPersona("hurd".to_string()));
    }

    #[test]
    fn round_trips_through_display() {
        for persona in [Persona::Undefined, Persona::Linux, Persona::Linux32] {
            assert_eq!(persona.to_string().parse(), Ok(persona));
        }
    }

    #[test]
    fn undefined_apply_is_a_no_op() {
        Persona::Undefined.apply().unwrap();
    }
}

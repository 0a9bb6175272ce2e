//! Facets: named capability modules attached to chroots.
//!
//! Each facet knows how to (de)serialise itself from a keyfile section,
//! which keys it owns, which environment variables it contributes to setup
//! scripts, and which session flags it adds. Storage facets additionally
//! implement [`storage::Storage`].

pub mod block_device;
pub mod btrfs_snapshot;
pub mod custom;
pub mod directory;
pub mod factory;
pub mod file;
pub mod fsunion;
pub mod loopback;
pub mod lvm_snapshot;
pub mod mountable;
pub mod personality;
pub mod plain;
pub mod session;
pub mod session_clonable;
pub mod source;
pub mod source_clonable;
pub mod storage;

use std::any::Any;
use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::environment::Environment;
use crate::error::Result;
use crate::keyfile::Keyfile;

use super::{Chroot, SessionFlags};

/// A named capability attached to a chroot.
pub trait Facet: Debug + DynClone {
    /// The facet name, also used as the registry key.
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Storage facets return themselves here.
    fn storage(&self) -> Option<&dyn storage::Storage> {
        None
    }

    /// Session flags this facet contributes.
    fn session_flags(&self, _chroot: &Chroot) -> SessionFlags {
        SessionFlags::empty()
    }

    /// The keyfile keys this facet consumes. Must exactly cover what
    /// `set_keyfile` reads.
    fn used_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Populate the facet from a keyfile section.
    fn set_keyfile(&mut self, _section: &str, _keyfile: &Keyfile) -> Result<()> {
        Ok(())
    }

    /// Serialise the facet into a keyfile section.
    fn get_keyfile(&self, _section: &str, _keyfile: &mut Keyfile) {}

    /// Contribute environment variables for setup scripts and commands.
    fn setup_env(&self, _chroot: &Chroot, _env: &mut Environment) {}

    /// Rewrite storage-specific identifiers when a session is cloned from
    /// `original_name` as `session_id`. Called on the cloned facet.
    fn clone_session_setup(&mut self, _original_name: &str, _session_id: &str) {}

    /// Adjust `clone` when the source branch of a snapshot chroot is
    /// derived. Called on the original facet.
    fn clone_source_setup(&self, _original: &Chroot, _clone: &mut Chroot) -> Result<()> {
        Ok(())
    }
}

dyn_clone::clone_trait_object!(Facet);

/// Install facets whose presence is keyed on the configuration: the
/// personality, filesystem union, mountable and source-clonable facets.
/// Runs before key dispatch so the new facets see their keys.
pub(super) fn install_optional(
    chroot: &mut Chroot,
    section: &str,
    keyfile: &Keyfile,
) -> Result<()> {
    if keyfile.get_value(section, "personality").is_some() {
        chroot.add_facet(Box::new(personality::Personality::new()));
    }
    if keyfile.get_value(section, "union-type").is_some() {
        chroot.add_facet(Box::new(fsunion::FsUnion::new()));
    }
    if keyfile.get_value(section, "mount-options").is_some()
        || keyfile.get_value(section, "location").is_some()
    {
        chroot.add_facet(Box::new(mountable::Mountable::new()));
    }

    let chroot_type = chroot.chroot_type();
    let source_capable = matches!(chroot_type, "lvm-snapshot" | "btrfs-snapshot")
        || keyfile
            .get::<bool>(section, "custom-source-cloneable")?
            .unwrap_or(false);
    if source_capable {
        chroot.add_facet(Box::new(source_clonable::SourceClonable::new()));
    }

    Ok(())
}

/// Install capability facets derived from the parsed configuration: the
/// session-clonable facet for storage that supports sessions, and the
/// script policy for plain chroots. Runs after key dispatch.
pub(super) fn install_capabilities(chroot: &mut Chroot) {
    let chroot_type = chroot.chroot_type();

    let union_active = chroot
        .facet::<fsunion::FsUnion>()
        .map(|u| u.is_active())
        .unwrap_or(false);
    let custom_session = chroot
        .facet::<custom::Custom>()
        .map(|c| c.session_cloneable)
        .unwrap_or(false);

    let session_capable = match chroot_type {
        "directory" | "file" | "lvm-snapshot" | "btrfs-snapshot" => true,
        "block-device" | "loopback" => union_active,
        "custom" => custom_session,
        _ => false,
    };
    if session_capable {
        chroot.add_facet(Box::new(session_clonable::SessionClonable::new()));
    }

    if chroot_type == "plain" {
        chroot.run_setup_scripts = false;
    }
}

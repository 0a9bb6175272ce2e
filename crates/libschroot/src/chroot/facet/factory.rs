//! Registry of facet constructors, keyed by facet name.
//!
//! The registry replaces scattered per-type factories: configuration
//! loading asks it for the storage facet selected by the `type` key, and
//! `--version` style output can enumerate what was compiled in.

use std::collections::BTreeMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::feature;

use super::Facet;

#[derive(Clone)]
pub struct FacetInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub create: fn() -> Box<dyn Facet>,
}

static REGISTRY: Lazy<Mutex<BTreeMap<&'static str, FacetInfo>>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    for info in builtin() {
        map.insert(info.name, info);
    }
    Mutex::new(map)
});

fn builtin() -> Vec<FacetInfo> {
    vec![
        FacetInfo {
            name: super::plain::FACET_NAME,
            description: "Plain directory chroot (no sessions, no scripts)",
            create: || Box::new(super::plain::Plain::new()),
        },
        FacetInfo {
            name: super::directory::FACET_NAME,
            description: "Directory chroot",
            create: || Box::new(super::directory::Directory::new()),
        },
        FacetInfo {
            name: super::file::FACET_NAME,
            description: "File archive chroot",
            create: || Box::new(super::file::FileArchive::new()),
        },
        FacetInfo {
            name: super::block_device::FACET_NAME,
            description: "Block device chroot",
            create: || Box::new(super::block_device::BlockDevice::new()),
        },
        FacetInfo {
            name: super::loopback::FACET_NAME,
            description: "Loopback file chroot",
            create: || Box::new(super::loopback::Loopback::new()),
        },
        FacetInfo {
            name: super::lvm_snapshot::FACET_NAME,
            description: "LVM snapshot chroot",
            create: || Box::new(super::lvm_snapshot::LvmSnapshot::new()),
        },
        FacetInfo {
            name: super::btrfs_snapshot::FACET_NAME,
            description: "Btrfs snapshot chroot",
            create: || Box::new(super::btrfs_snapshot::BtrfsSnapshot::new()),
        },
        FacetInfo {
            name: super::custom::FACET_NAME,
            description: "Custom chroot (storage delegated to setup scripts)",
            create: || Box::new(super::custom::Custom::new()),
        },
        FacetInfo {
            name: super::session::FACET_NAME,
            description: "Live session state",
            create: || Box::new(super::session::Session::default()),
        },
        FacetInfo {
            name: super::session_clonable::FACET_NAME,
            description: "Session support",
            create: || Box::new(super::session_clonable::SessionClonable::new()),
        },
        FacetInfo {
            name: super::source_clonable::FACET_NAME,
            description: "Source chroot support",
            create: || Box::new(super::source_clonable::SourceClonable::new()),
        },
        FacetInfo {
            name: super::source::FACET_NAME,
            description: "Source chroot marker",
            create: || Box::new(super::source::Source::new()),
        },
        FacetInfo {
            name: super::personality::FACET_NAME,
            description: "Linux personality support",
            create: || Box::new(super::personality::Personality::new()),
        },
        FacetInfo {
            name: super::mountable::FACET_NAME,
            description: "Mount options and location",
            create: || Box::new(super::mountable::Mountable::new()),
        },
        FacetInfo {
            name: super::fsunion::FACET_NAME,
            description: "Filesystem union support",
            create: || Box::new(super::fsunion::FsUnion::new()),
        },
    ]
}

/// Create a facet by name.
pub fn create(name: &str) -> Option<Box<dyn Facet>> {
    let registry = REGISTRY.lock().expect("facet registry poisoned");
    registry.get(name).map(|info| (info.create)())
}

/// The registered facet names with their descriptions, sorted.
pub fn registered() -> Vec<(&'static str, &'static str)> {
    let registry = REGISTRY.lock().expect("facet registry poisoned");
    registry
        .values()
        .map(|info| (info.name, info.description))
        .collect()
}

/// Announce the storage types as features.
pub fn register_features() {
    for (name, description) in registered() {
        feature::register(&format!("FACET_{}", name.to_uppercase().replace('-', "_")), description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_by_name() {
        let facet = create("directory").expect("registered");
        assert_eq!(facet.name(), "directory");
        assert!(facet.storage().is_some());

        let facet = create("personality").expect("registered");
        assert!(facet.storage().is_none());

        assert!(create("nonesuch").is_none());
    }

    #[test]
    fn all_storage_types_are_registered() {
        for name in [
            "plain",
            "directory",
            "file",
            "block-device",
            "loopback",
            "lvm-snapshot",
            "btrfs-snapshot",
            "custom",
        ] {
            let facet = create(name).expect(name);
            assert!(facet.storage().is_some(), "{name} is storage");
        }
    }
}

//! Stackable filesystem union support: a writable overlay per session on
//! top of read-only storage, making block-device and loopback chroots
//! session-capable.

use std::any::Any;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;

use super::super::Chroot;
use super::storage::{ReleaseAction, SetupContext};
use super::Facet;

pub const FACET_NAME: &str = "fsunion";

#[derive(Debug, Clone, Default)]
pub struct FsUnion {
    /// `none` or an overlay filesystem type, normally `overlay`.
    pub union_type: String,
    pub overlay_directory: Option<String>,
    pub underlay_directory: Option<String>,
    pub mount_options: Option<String>,
}

impl FsUnion {
    pub fn new() -> Self {
        Self {
            union_type: "none".to_string(),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.union_type != "none" && !self.union_type.is_empty()
    }

    /// Mount the union on top of the already-mounted storage. The storage
    /// is remounted at the underlay path and the overlay becomes the
    /// session root.
    pub fn setup(&self, _chroot: &Chroot, ctx: &mut SetupContext<'_>) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }

        let overlay_base = self
            .overlay_directory
            .clone()
            .unwrap_or_else(|| "/var/lib/schroot/union/overlay".to_string());
        let underlay_base = self
            .underlay_directory
            .clone()
            .unwrap_or_else(|| "/var/lib/schroot/union/underlay".to_string());
        let upper = PathBuf::from(&overlay_base).join(&ctx.session_id);
        let work = PathBuf::from(&overlay_base).join(format!("{}.work", ctx.session_id));
        let lower = PathBuf::from(&underlay_base).join(&ctx.session_id);

        let target = ctx.mount_location.clone();
        // Move the read-only storage aside to become the lower branch.
        ctx.run(
            "mount",
            &[
                "--move".to_string(),
                target.display().to_string(),
                lower.display().to_string(),
            ],
            |status| Error::Mount {
                target: lower.clone(),
                status,
            },
        )?;
        ctx.release.push(ReleaseAction::Unmount(lower.clone()));

        let mut options = format!(
            "lowerdir={},upperdir={},workdir={}",
            lower.display(),
            upper.display(),
            work.display()
        );
        if let Some(extra) = &self.mount_options {
            options.push(',');
            options.push_str(extra);
        }
        ctx.run(
            "mount",
            &[
                "-t".to_string(),
                self.union_type.clone(),
                "-o".to_string(),
                options,
                self.union_type.clone(),
                target.display().to_string(),
            ],
            |status| Error::Mount {
                target: target.clone(),
                status,
            },
        )?;
        ctx.release.push(ReleaseAction::Unmount(target));
        Ok(())
    }
}

impl Facet for FsUnion {
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
        &[
            "union-type",
            "union-overlay-directory",
            "union-underlay-directory",
            "union-mount-options",
        ]
    }

    fn set_keyfile(&mut self, section: &str, keyfile: &Keyfile) -> Result<()> {
        if let Some(union_type) = keyfile.get_value(section, "union-type") {
            self.union_type = union_type.to_string();
        }
        self.overlay_directory = keyfile
            .get_value(section, "union-overlay-directory")
            .map(str::to_string);
        self.underlay_directory = keyfile
            .get_value(section, "union-underlay-directory")
            .map(str::to_string);
        self.mount_options = keyfile
            .get_value(section, "union-mount-options")
            .map(str::to_string);
        Ok(())
    }

    fn get_keyfile(&self, section: &str, keyfile: &mut Keyfile) {
        keyfile.set_value(section, "union-type", &self.union_type);
        if let Some(dir) = &self.overlay_directory {
            keyfile.set_value(section, "union-overlay-directory", dir);
        }
        if let Some(dir) = &self.underlay_directory {
            keyfile.set_value(section, "union-underlay-directory", dir);
        }
        if let Some(options) = &self.mount_options {
            keyfile.set_value(section, "union-mount-options", options);
        }
    }

    fn setup_env(&self, _chroot: &Chroot, env: &mut Environment) {
        env.add("CHROOT_UNION_TYPE", self.union_type.clone());
        if let Some(dir) = &self.overlay_directory {
            env.add("CHROOT_UNION_OVERLAY_DIRECTORY", dir.clone());
        }
        if let Some(dir) = &self.underlay_directory {
            env.add("CHROOT_UNION_UNDERLAY_DIRECTORY", dir.clone());
        }
    }
}

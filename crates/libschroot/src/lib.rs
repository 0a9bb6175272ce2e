//! # libschroot
//!
//! Library for securely entering chroots: chroot definitions composed of
//! facets, persisted sessions, the lifecycle engine that prepares storage
//! and executes commands with dropped privileges, and the supporting
//! configuration and authentication machinery. The `schroot`, `dchroot`
//! and `csbuild` front-ends are thin adapters over this crate.

pub mod auth;
pub mod chroot;
pub mod config;
pub mod environment;
pub mod error;
pub mod feature;
pub mod keyfile;
pub mod mounts;
pub mod paths;
pub mod personality;
pub mod run_parts;
pub mod session;
pub mod signals;
pub mod syscall;
pub mod util;
pub mod verbosity;

use once_cell::sync::OnceCell;

static INIT: OnceCell<()> = OnceCell::new();

/// One-time process initialisation: announce compiled-in capabilities.
/// Safe to call more than once.
pub fn init() {
    INIT.get_or_init(|| {
        feature::register("SESSIONS", "Persistent session support");
        feature::register("UNION", "Filesystem union support");
        feature::register("PERSONALITY", "Linux personality support");
        #[cfg(feature = "pam")]
        feature::register("PAM", "PAM authentication support");
        chroot::facet::factory::register_features();
    });
}

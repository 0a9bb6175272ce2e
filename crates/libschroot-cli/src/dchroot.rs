//! The restricted compatibility front-end: no user switching, no session
//! management, command directories equal login directories.

use std::path::PathBuf;

use clap::Parser;

use crate::GlobalOpts;

/// Run a command or login shell in a chroot (compatibility interface).
#[derive(Parser, Debug)]
#[command(name = "dchroot", version)]
pub struct DchrootOptions {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Use the specified chroot (may be repeated)
    #[arg(short, long = "chroot", value_name = "CHROOT")]
    pub chroot: Vec<String>,

    /// Select all chroots
    #[arg(long)]
    pub all: bool,

    /// List available chroots
    #[arg(short, long)]
    pub list: bool,

    /// Show information about the selected chroots
    #[arg(short, long)]
    pub info: bool,

    /// Directory to change to inside the chroot
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Preserve the caller's environment
    #[arg(short, long = "preserve-environment")]
    pub preserve_environment: bool,

    /// Command to run; a login shell is started if omitted
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

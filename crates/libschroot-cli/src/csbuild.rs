//! The batch-build front-end: non-interactive, transient sessions only.

use clap::Parser;

use crate::GlobalOpts;

/// Run a build command in a transient chroot session.
#[derive(Parser, Debug)]
#[command(name = "csbuild", version)]
pub struct CsbuildOptions {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// The chroot to build in
    #[arg(short, long = "chroot", value_name = "CHROOT", required = true)]
    pub chroot: String,

    /// Name for the transient build session
    #[arg(short = 'n', long = "session-name", value_name = "NAME")]
    pub session_name: Option<String>,

    /// Build command to run
    #[arg(trailing_var_arg = true, value_name = "COMMAND", required = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_chroot_and_command() {
        let opts = CsbuildOptions::parse_from([
            "csbuild",
            "-c",
            "sid",
            "--",
            "dpkg-buildpackage",
            "-us",
            "-uc",
        ]);
        assert_eq!(opts.chroot, "sid");
        assert_eq!(opts.command[0], "dpkg-buildpackage");

        assert!(CsbuildOptions::try_parse_from(["csbuild", "-c", "sid"]).is_err());
        assert!(CsbuildOptions::try_parse_from(["csbuild", "--", "true"]).is_err());
    }
}

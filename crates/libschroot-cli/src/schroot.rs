//! The full option surface of the general-purpose front-end.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::GlobalOpts;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Chroots only.
    Chroots,
    /// Chroots, sessions and source chroots.
    All,
    /// Sessions only.
    Sessions,
    /// Source chroots only.
    Source,
}

/// Chroot selection.
#[derive(Parser, Debug, Default)]
pub struct SelectOpts {
    /// Use the specified chroot (may be repeated)
    #[arg(short, long = "chroot", value_name = "CHROOT")]
    pub chroot: Vec<String>,

    /// Select all chroots and active sessions
    #[arg(long)]
    pub all: bool,
}

/// What to do; the default with none of these is to run a command or
/// shell in the selected chroots.
#[derive(Parser, Debug, Default)]
pub struct ActionOpts {
    /// Print version information
    #[arg(short = 'V', long)]
    pub version: bool,

    /// List available chroots
    #[arg(
        short,
        long,
        value_name = "WHAT",
        value_enum,
        num_args = 0..=1,
        default_missing_value = "chroots"
    )]
    pub list: Option<ListMode>,

    /// Show information about the selected chroots
    #[arg(short, long)]
    pub info: bool,

    /// Dump the configuration of the selected chroots
    #[arg(long)]
    pub config: bool,

    /// Print the location (path) of the selected chroots
    #[arg(long)]
    pub location: bool,

    /// Begin a session in the specified chroot
    #[arg(short, long = "begin-session", value_name = "CHROOT")]
    pub begin_session: Option<String>,

    /// Recover the specified session
    #[arg(long = "recover-session", value_name = "SESSION")]
    pub recover_session: Option<String>,

    /// Run the command in the specified session
    #[arg(short, long = "run-session", value_name = "SESSION")]
    pub run_session: Option<String>,

    /// End the specified session
    #[arg(short, long = "end-session", value_name = "SESSION")]
    pub end_session: Option<String>,

    /// Name for the session to begin
    #[arg(short = 'n', long = "session-name", value_name = "NAME")]
    pub session_name: Option<String>,
}

/// Options affecting command execution.
#[derive(Parser, Debug, Default)]
pub struct RunOpts {
    /// Username to run as (defaults to the current user)
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Directory to change to inside the chroot
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Preserve the caller's environment
    #[arg(short, long = "preserve-environment")]
    pub preserve_environment: bool,
}

/// Securely enter a chroot and run a command or login shell.
#[derive(Parser, Debug)]
#[command(name = "schroot", version, disable_version_flag = true)]
pub struct SchrootOptions {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(flatten)]
    pub select: SelectOpts,

    #[command(flatten)]
    pub action: ActionOpts,

    #[command(flatten)]
    pub run: RunOpts,

    /// Command to run; a login shell is started if omitted
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_transient_run() {
        let opts = SchrootOptions::parse_from(["schroot", "-c", "sid", "--", "/bin/true"]);
        assert_eq!(opts.select.chroot, vec!["sid"]);
        assert_eq!(opts.command, vec!["/bin/true"]);
        assert!(opts.action.list.is_none());
    }

    #[test]
    fn parses_session_verbs() {
        let opts = SchrootOptions::parse_from(["schroot", "--begin-session", "sid", "-n", "build-1"]);
        assert_eq!(opts.action.begin_session.as_deref(), Some("sid"));
        assert_eq!(opts.action.session_name.as_deref(), Some("build-1"));

        let opts =
            SchrootOptions::parse_from(["schroot", "--run-session", "abc123", "--", "make"]);
        assert_eq!(opts.action.run_session.as_deref(), Some("abc123"));
        assert_eq!(opts.command, vec!["make"]);
    }

    #[test]
    fn list_defaults_to_chroots() {
        let opts = SchrootOptions::parse_from(["schroot", "--list"]);
        assert_eq!(opts.action.list, Some(ListMode::Chroots));

        let opts = SchrootOptions::parse_from(["schroot", "--list", "sessions"]);
        assert_eq!(opts.action.list, Some(ListMode::Sessions));
    }

    #[test]
    fn run_modifiers() {
        let opts = SchrootOptions::parse_from([
            "schroot", "-c", "sid", "-u", "root", "-p", "-d", "/src", "--", "id",
        ]);
        assert_eq!(opts.run.user.as_deref(), Some("root"));
        assert!(opts.run.preserve_environment);
        assert_eq!(opts.run.directory.as_deref(), Some(std::path::Path::new("/src")));
    }
}

//! A seam over the privileged operations the engine performs, so the
//! lifecycle can be driven in tests without touching the host.

pub mod linux;

use std::fmt::Debug;
use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::Result;
use crate::personality::Persona;
use crate::signals::SignalState;

pub use linux::LinuxSyscall;

/// Everything needed to execute the user's command inside the chroot.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    /// The directory to chroot(2) into.
    pub root: PathBuf,
    /// Working directory candidates, tried in order inside the chroot.
    pub directories: Vec<PathBuf>,
    pub persona: Persona,
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
    pub program: String,
    pub argv: Vec<String>,
    pub env: Environment,
}

pub trait Syscall: Debug {
    /// Run an external program to completion with inherited stdio,
    /// returning its exit status.
    fn run_command(&self, program: &str, args: &[String]) -> std::io::Result<i32>;

    /// As [`Syscall::run_command`], also capturing standard output.
    fn run_command_output(&self, program: &str, args: &[String])
        -> std::io::Result<(i32, String)>;

    /// Fork, enter the chroot, drop privileges, execute the command and
    /// wait for it, forwarding pending cancellation signals to the child.
    /// Returns the child's exit status.
    fn spawn(&self, spec: &ExecSpec, signals: Option<&SignalState>) -> Result<i32>;
}

//! The real implementation of the syscall seam.

use std::ffi::CString;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Gid, Pid, Uid};

use crate::error::{Error, Result};
use crate::signals::SignalState;

use super::{ExecSpec, Syscall};

#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSyscall;

impl Syscall for LinuxSyscall {
    fn run_command(&self, program: &str, args: &[String]) -> std::io::Result<i32> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()?;
        Ok(status.code().unwrap_or_else(|| {
            128 + status.signal().unwrap_or(0)
        }))
    }

    fn run_command_output(
        &self,
        program: &str,
        args: &[String],
    ) -> std::io::Result<(i32, String)> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        let status = output.status.code().unwrap_or_else(|| {
            128 + output.status.signal().unwrap_or(0)
        });
        Ok((status, String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn spawn(&self, spec: &ExecSpec, signals: Option<&SignalState>) -> Result<i32> {
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => {
                let status = child_exec(spec);
                // Only reached when setup or exec failed.
                std::process::exit(status);
            }
            Ok(ForkResult::Parent { child }) => wait_for_child(spec, child, signals),
            Err(err) => Err(Error::ChildExec {
                command: spec.program.clone(),
                source: std::io::Error::from(err),
            }),
        }
    }
}

/// The child side: enter the chroot, pick a working directory, set the
/// execution domain, drop privileges and exec. Returns the exit status to
/// die with on failure.
fn child_exec(spec: &ExecSpec) -> i32 {
    if let Err(err) = unistd::chroot(&spec.root) {
        eprintln!("{}: failed to enter chroot: {err}", spec.root.display());
        return 1;
    }

    if !enter_directory(&spec.directories) {
        eprintln!("failed to change to any working directory");
        return 1;
    }

    if let Err(err) = spec.persona.apply() {
        eprintln!("failed to set personality '{}': {err}", spec.persona);
        return 1;
    }

    if let Err(err) = drop_privileges(spec) {
        eprintln!("failed to drop privileges: {err}");
        return 1;
    }

    let Ok(program) = CString::new(spec.program.as_str()) else {
        return 1;
    };
    let argv: Vec<CString> = spec
        .argv
        .iter()
        .filter_map(|arg| CString::new(arg.as_str()).ok())
        .collect();
    let env = spec.env.to_exec();

    match unistd::execvpe(&program, &argv, &env) {
        Ok(_) => unreachable!("execvpe returned"),
        Err(err) => {
            eprintln!("{}: failed to execute: {err}", spec.program);
            127
        }
    }
}

fn enter_directory(candidates: &[std::path::PathBuf]) -> bool {
    for (index, dir) in candidates.iter().enumerate() {
        match unistd::chdir(dir.as_path()) {
            Ok(()) => {
                if index > 0 {
                    eprintln!("warning: falling back to directory '{}'", dir.display());
                }
                return true;
            }
            Err(_) => continue,
        }
    }
    false
}

fn drop_privileges(spec: &ExecSpec) -> nix::Result<()> {
    let uid = Uid::from_raw(spec.uid);
    let gid = Gid::from_raw(spec.gid);

    if unistd::geteuid().is_root() {
        let groups: Vec<Gid> = spec.groups.iter().map(|g| Gid::from_raw(*g)).collect();
        unistd::setgroups(&groups)?;
    }
    unistd::setresgid(gid, gid, gid)?;
    unistd::setresuid(uid, uid, uid)?;
    Ok(())
}

fn wait_for_child(spec: &ExecSpec, child: Pid, signals: Option<&SignalState>) -> Result<i32> {
    loop {
        match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, status)) => return Ok(status),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                return Err(Error::ChildSignal {
                    command: spec.program.clone(),
                    signal: signal as i32,
                })
            }
            Ok(_) => {
                if let Some(state) = signals {
                    if let Some(pending) = state.take_pending() {
                        if let Ok(signal) = Signal::try_from(pending) {
                            let _ = kill(child, signal);
                        }
                    }
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(err) => {
                return Err(Error::ChildExec {
                    command: spec.program.clone(),
                    source: std::io::Error::from(err),
                })
            }
        }
    }
}

//! The shared front-end driver: configuration loading, engine dispatch
//! and error reporting.

use libschroot::config::ConfigStore;
use libschroot::error::Error;
use libschroot::feature;
use libschroot::paths;
use libschroot::session::engine::{Engine, Outcome, Policy, Request};
use libschroot::syscall::LinuxSyscall;

pub struct Frontend {
    pub program: &'static str,
    pub policy: Policy,
}

impl Frontend {
    pub fn new(program: &'static str, policy: Policy) -> Self {
        Self { program, policy }
    }

    /// Load the system configuration: the single file, then the fragment
    /// directory.
    pub fn load_config(&self) -> Result<ConfigStore, Error> {
        let mut config = ConfigStore::new();
        let file = paths::config_file();
        if file.is_file() {
            config.load_file(&file)?;
        }
        config.load_directory(&paths::chroot_dir())?;
        Ok(config)
    }

    /// Run one engine request, reporting any failure on stderr. Returns
    /// the process exit status: the command's on success, 1 on failure.
    pub fn execute(&self, config: &ConfigStore, request: &Request) -> i32 {
        let syscall = LinuxSyscall;
        let mut engine = Engine::new(config, &syscall).with_policy(self.policy.clone());
        if let Err(err) = engine.install_signal_handlers() {
            tracing::warn!(%err, "failed to install signal handlers");
        }

        match engine.run(request) {
            Ok(Outcome {
                status,
                session_id,
            }) => {
                if let Some(id) = session_id {
                    if matches!(
                        request.operation,
                        libschroot::session::engine::Operation::Begin
                    ) {
                        println!("{id}");
                    }
                }
                status
            }
            Err(err) => {
                self.report(&request.chroot, &err);
                1
            }
        }
    }

    /// One line to stderr: `<program>: <chroot-or-session>: <kind>: <reason>`.
    pub fn report(&self, context: &str, err: &Error) {
        eprintln!("{}: {}: {}: {}", self.program, context, err.kind(), err);
    }

    /// Version banner plus the compiled-in feature list.
    pub fn print_version(&self) {
        println!("{} (schroot) {}", self.program, env!("CARGO_PKG_VERSION"));
        println!("Written by the schroot team");
        println!();
        println!("Features:");
        for (name, description) in feature::snapshot() {
            println!("  {name:<24}{description}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_format_matches_the_contract() {
        // The format itself is asserted by rendering the parts the same
        // way report() does.
        let err = Error::UnknownChroot("sid".to_string());
        let line = format!("schroot: {}: {}: {}", "sid", err.kind(), err);
        assert_eq!(line, "schroot: sid: UNKNOWN_CHROOT: sid: no such chroot");
    }
}

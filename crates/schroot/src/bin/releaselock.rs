//! schroot-releaselock: release a stale advisory lock left behind by a
//! crashed invocation. Used by the setup scripts and by administrators.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use libschroot::session::lock::StorageLock;

/// Release a device or file lock.
#[derive(Parser, Debug)]
#[command(name = "schroot-releaselock", version)]
struct Options {
    /// The lock file to release
    #[arg(short, long = "lockfile", value_name = "PATH", required = true)]
    lockfile: PathBuf,

    /// The process believed to hold the lock
    #[arg(short, long, value_name = "PID")]
    pid: Option<i32>,
}

fn main() {
    let opts = Options::parse();

    if let Some(pid) = opts.pid {
        // A live holder means the lock is not stale.
        if unsafe { libc::kill(pid, 0) } == 0 {
            eprintln!(
                "schroot-releaselock: {}: still held by running process {pid}",
                opts.lockfile.display()
            );
            std::process::exit(1);
        }
    }

    // Advisory locks die with their holder; if the lock can be taken it
    // is free, so taking and dropping it verifies the release.
    match StorageLock::acquire(&opts.lockfile, Duration::from_millis(100)) {
        Ok(lock) => {
            if let Err(err) = lock.unlock() {
                eprintln!("schroot-releaselock: {err}");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("schroot-releaselock: {err}");
            std::process::exit(1);
        }
    }
}

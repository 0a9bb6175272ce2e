//! schroot-listmounts: print the mount points at or below a path, in
//! unmount order, one per line. Used by the setup scripts.

use std::path::PathBuf;

use clap::Parser;

use libschroot::mounts;

/// List mounts below a mount point.
#[derive(Parser, Debug)]
#[command(name = "schroot-listmounts", version)]
struct Options {
    /// The mount point to check
    #[arg(short, long = "mountpoint", value_name = "PATH", required = true)]
    mountpoint: PathBuf,
}

fn main() {
    let opts = Options::parse();

    match mounts::mounts_under(&opts.mountpoint) {
        Ok(mounts) => {
            for mount in mounts {
                println!("{}", mount.display());
            }
        }
        Err(err) => {
            eprintln!("schroot-listmounts: {err}");
            std::process::exit(1);
        }
    }
}

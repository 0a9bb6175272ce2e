//! csbuild: run a build command in a transient chroot session. Always
//! non-interactive; the session is created, used and purged in one go.

use clap::Parser;

use libschroot::session::engine::{Operation, Policy, Request};
use libschroot_cli::CsbuildOptions;
use schroot::{frontend::Frontend, logger};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let opts = CsbuildOptions::parse();

    if let Err(err) = logger::init(opts.global.quiet, opts.global.verbose) {
        eprintln!("csbuild: failed to initialise logging: {err:?}");
    }
    libschroot::init();

    let frontend = Frontend::new(
        "csbuild",
        Policy {
            allow_user_switching: false,
            force_login_directories: false,
            service: "csbuild".to_string(),
        },
    );

    let config = match frontend.load_config() {
        Ok(config) => config,
        Err(err) => {
            frontend.report("configuration", &err);
            return 1;
        }
    };

    let mut request = Request::new(Operation::Run, &opts.chroot);
    request.command = opts.command.clone();
    request.session_name = opts.session_name.clone();
    frontend.execute(&config, &request)
}

//! dchroot: compatibility front-end with restricted semantics. Chroots
//! are entered only as the calling user, and commands start in the same
//! directories a login would.

use clap::Parser;

use libschroot::session::engine::{Operation, Policy, Request};
use libschroot_cli::{DchrootOptions, ListMode};
use schroot::{commands, frontend::Frontend, logger};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let opts = DchrootOptions::parse();

    if let Err(err) = logger::init(opts.global.quiet, opts.global.verbose) {
        eprintln!("dchroot: failed to initialise logging: {err:?}");
    }
    libschroot::init();

    let frontend = Frontend::new(
        "dchroot",
        Policy {
            allow_user_switching: false,
            force_login_directories: true,
            service: "dchroot".to_string(),
        },
    );

    let config = match frontend.load_config() {
        Ok(config) => config,
        Err(err) => {
            frontend.report("configuration", &err);
            return 1;
        }
    };

    if opts.list {
        return commands::list(&config, ListMode::Chroots);
    }

    let selected: Vec<String> = if opts.all {
        config.names()
    } else {
        opts.chroot.clone()
    };

    if opts.info {
        return commands::info(&config, &selected, frontend.program);
    }

    if selected.is_empty() {
        eprintln!("dchroot: no chroot specified (use -c or --help)");
        return 1;
    }

    let mut status = 0;
    for chroot in &selected {
        let mut request = Request::new(Operation::Run, chroot);
        request.command = opts.command.clone();
        request.directory = opts.directory.clone();
        request.preserve_environment = opts.preserve_environment;
        let result = frontend.execute(&config, &request);
        if result != 0 {
            status = result;
        }
    }
    status
}

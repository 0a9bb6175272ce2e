//! schroot: securely enter a chroot and run a command or login shell.

use clap::Parser;

use libschroot::session::engine::{Operation, Policy, Request};
use libschroot_cli::SchrootOptions;
use schroot::{commands, frontend::Frontend, logger};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let opts = SchrootOptions::parse();

    if let Err(err) = logger::init(opts.global.quiet, opts.global.verbose) {
        eprintln!("schroot: failed to initialise logging: {err:?}");
    }
    libschroot::init();

    let frontend = Frontend::new("schroot", Policy::default());

    if opts.action.version {
        frontend.print_version();
        return 0;
    }

    let config = match frontend.load_config() {
        Ok(config) => config,
        Err(err) => {
            frontend.report("configuration", &err);
            return 1;
        }
    };

    if let Some(mode) = opts.action.list {
        return commands::list(&config, mode);
    }

    let selected: Vec<String> = if opts.select.all {
        config.names()
    } else {
        opts.select.chroot.clone()
    };
    if opts.action.info {
        return commands::info(&config, &selected, frontend.program);
    }
    if opts.action.config {
        return commands::config(&config, &selected, frontend.program);
    }
    if opts.action.location {
        return commands::location(&config, &selected, frontend.program);
    }

    // Session verbs take precedence over the default run behaviour.
    let requests = build_requests(&opts, &selected, frontend.program);
    let Some(requests) = requests else {
        return 1;
    };

    let mut status = 0;
    for request in requests {
        let result = frontend.execute(&config, &request);
        if result != 0 {
            status = result;
        }
    }
    status
}

/// Map the parsed options onto engine requests.
fn build_requests(
    opts: &SchrootOptions,
    selected: &[String],
    program: &str,
) -> Option<Vec<Request>> {
    let mut requests = Vec::new();

    if let Some(chroot) = &opts.action.begin_session {
        let mut request = Request::new(Operation::Begin, chroot);
        request.session_name = opts.action.session_name.clone();
        request.user = opts.run.user.clone();
        requests.push(request);
        return Some(requests);
    }
    if let Some(session) = &opts.action.recover_session {
        requests.push(Request::new(Operation::Recover, session));
        return Some(requests);
    }
    if let Some(session) = &opts.action.run_session {
        let mut request = Request::new(Operation::RunSession, session);
        apply_run_options(&mut request, opts);
        requests.push(request);
        return Some(requests);
    }
    if let Some(session) = &opts.action.end_session {
        requests.push(Request::new(Operation::End, session));
        return Some(requests);
    }

    if selected.is_empty() {
        eprintln!("{program}: no chroot specified (use -c or --help)");
        return None;
    }
    for chroot in selected {
        let mut request = Request::new(Operation::Run, chroot);
        apply_run_options(&mut request, opts);
        requests.push(request);
    }
    Some(requests)
}

fn apply_run_options(request: &mut Request, opts: &SchrootOptions) {
    request.command = opts.command.clone();
    request.user = opts.run.user.clone();
    request.directory = opts.run.directory.clone();
    request.preserve_environment = opts.run.preserve_environment;
}

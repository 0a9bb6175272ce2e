use libschroot::config::ConfigStore;
use libschroot::session::Session;
use libschroot::verbosity::{self, Verbosity};
use libschroot_cli::ListMode;

/// Print the selected chroot names, one per line. Verbose output appends
/// the description.
pub fn list(config: &ConfigStore, mode: ListMode) -> i32 {
    let verbose = verbosity::get() == Verbosity::Verbose;

    let want_chroots = matches!(mode, ListMode::Chroots | ListMode::All);
    let want_source = matches!(mode, ListMode::Source | ListMode::All);
    let want_sessions = matches!(mode, ListMode::Sessions | ListMode::All);

    for chroot in config.chroots() {
        let is_source = chroot.name.starts_with("source:");
        if (is_source && !want_source) || (!is_source && !want_chroots) {
            continue;
        }
        match (&chroot.description, verbose) {
            (Some(description), true) => println!("{:<24}{description}", chroot.name),
            _ => println!("{}", chroot.name),
        }
    }

    if want_sessions {
        match Session::all_ids() {
            Ok(ids) => {
                for id in ids {
                    println!("session:{id}");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to list sessions");
                return 1;
            }
        }
    }
    0
}

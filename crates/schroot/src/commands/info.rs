use libschroot::chroot::Chroot;
use libschroot::config::ConfigStore;

fn row(key: &str, value: &str) {
    println!("  {key:<22}{value}");
}

/// Human-readable details of the selected chroots.
pub fn info(config: &ConfigStore, names: &[String], program: &str) -> i32 {
    let mut status = 0;

    for name in names {
        let Some(chroot) = config.find(name) else {
            eprintln!("{program}: {name}: UNKNOWN_CHROOT: {name}: no such chroot");
            status = 1;
            continue;
        };
        print_chroot(chroot);
    }
    status
}

fn print_chroot(chroot: &Chroot) {
    println!("  ── Chroot ──");
    row("Name", &chroot.name);
    if let Some(description) = &chroot.description {
        row("Description", description);
    }
    row("Type", chroot.chroot_type());
    if let Ok(path) = chroot.path() {
        row("Path", &path.display().to_string());
    }
    if !chroot.aliases.is_empty() {
        row("Aliases", &chroot.aliases.join(" "));
    }
    if !chroot.users.is_empty() {
        row("Users", &chroot.users.join(" "));
    }
    if !chroot.groups.is_empty() {
        row("Groups", &chroot.groups.join(" "));
    }
    if !chroot.root_users.is_empty() {
        row("Root Users", &chroot.root_users.join(" "));
    }
    if !chroot.root_groups.is_empty() {
        row("Root Groups", &chroot.root_groups.join(" "));
    }
    row("Profile", &chroot.profile);
    row(
        "Session Managed",
        if chroot
            .session_flags()
            .contains(libschroot::chroot::SessionFlags::CREATE)
        {
            "true"
        } else {
            "false"
        },
    );
    println!();
}

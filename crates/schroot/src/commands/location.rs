use libschroot::config::ConfigStore;

/// Print the on-host path of each selected chroot.
pub fn location(config: &ConfigStore, names: &[String], program: &str) -> i32 {
    let mut status = 0;

    for name in names {
        let Some(chroot) = config.find(name) else {
            eprintln!("{program}: {name}: UNKNOWN_CHROOT: {name}: no such chroot");
            status = 1;
            continue;
        };
        match chroot.path() {
            Ok(path) => println!("{}", path.display()),
            Err(_) => {
                println!();
                status = 1;
            }
        }
    }
    status
}

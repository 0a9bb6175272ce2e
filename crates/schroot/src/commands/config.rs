use libschroot::config::ConfigStore;
use libschroot::keyfile::Keyfile;

/// Dump the configuration of the selected chroots in keyfile form.
pub fn config(config: &ConfigStore, names: &[String], program: &str) -> i32 {
    let mut status = 0;
    let mut keyfile = Keyfile::new();

    for name in names {
        match config.find(name) {
            Some(chroot) => chroot.to_keyfile(&mut keyfile),
            None => {
                eprintln!("{program}: {name}: UNKNOWN_CHROOT: {name}: no such chroot");
                status = 1;
            }
        }
    }

    print!("{}", keyfile.serialise());
    status
}

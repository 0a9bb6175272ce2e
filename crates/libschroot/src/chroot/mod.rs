//! Chroot definitions and their facet composition.
//!
//! A [`Chroot`] is an envelope carrying identity and shared policy; all
//! typed behaviour (storage, snapshotting, sessions, personality, unions)
//! lives in the facets attached to it. Exactly one storage facet is always
//! present; the others are optional.

pub mod facet;

use std::path::PathBuf;

use bitflags::bitflags;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::keyfile::Keyfile;
use crate::paths;
use facet::session::Session as SessionFacet;
use facet::source::Source;
use facet::source_clonable::SourceClonable;
use facet::storage::Storage;
use facet::Facet;

bitflags! {
    /// What a chroot's facets allow the session engine to do with it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SessionFlags: u32 {
        const CREATE = 1 << 0;
        const CLONE = 1 << 1;
        const PURGE = 1 << 2;
        const SOURCE = 1 << 3;
    }
}

/// Which stage of the lifecycle setup scripts are being run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupType {
    Start,
    Recover,
    Stop,
}

impl SetupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupType::Start => "setup-start",
            SetupType::Recover => "setup-recover",
            SetupType::Stop => "setup-stop",
        }
    }
}

/// Keys consumed by the envelope itself; everything else belongs to a
/// facet or is reported as unused.
const ENVELOPE_KEYS: &[&str] = &[
    "type",
    "description",
    "aliases",
    "users",
    "groups",
    "root-users",
    "root-groups",
    "profile",
    "script-config",
    "command-prefix",
    "environment-filter",
    "preserve-environment",
    "default-shell",
];

#[derive(Debug, Clone)]
pub struct Chroot {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub root_users: Vec<String>,
    pub root_groups: Vec<String>,
    /// Script configuration profile under the configuration root.
    pub profile: String,
    pub command_prefix: Vec<String>,
    pub environment_filter: String,
    pub preserve_environment: bool,
    pub default_shell: Option<String>,
    pub run_setup_scripts: bool,
    /// Where the root is made visible on the host. For plain and directory
    /// chroots outside a session this is the storage path itself.
    pub mount_location: Option<PathBuf>,
    facets: Vec<Box<dyn Facet>>,
}

impl Chroot {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            aliases: Vec::new(),
            users: Vec::new(),
            groups: Vec::new(),
            root_users: Vec::new(),
            root_groups: Vec::new(),
            profile: "default".to_string(),
            command_prefix: Vec::new(),
            environment_filter: crate::environment::DEFAULT_FILTER.to_string(),
            preserve_environment: false,
            default_shell: None,
            run_setup_scripts: true,
            mount_location: None,
            facets: Vec::new(),
        }
    }

    pub fn add_facet(&mut self, facet: Box<dyn Facet>) {
        self.facets.retain(|f| f.name() != facet.name());
        self.facets.push(facet);
    }

    pub fn remove_facet(&mut self, name: &str) {
        self.facets.retain(|f| f.name() != name);
    }

    pub fn facets(&self) -> impl Iterator<Item = &dyn Facet> {
        self.facets.iter().map(|f| f.as_ref())
    }

    pub fn facet_by_name(&self, name: &str) -> Option<&dyn Facet> {
        self.facets
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    pub fn facet<T: Facet + 'static>(&self) -> Option<&T> {
        self.facets
            .iter()
            .find_map(|f| f.as_any().downcast_ref::<T>())
    }

    pub fn facet_mut<T: Facet + 'static>(&mut self) -> Option<&mut T> {
        self.facets
            .iter_mut()
            .find_map(|f| f.as_any_mut().downcast_mut::<T>())
    }

    pub fn has_facet<T: Facet + 'static>(&self) -> bool {
        self.facet::<T>().is_some()
    }

    /// The storage facet. Every loaded chroot has exactly one.
    pub fn storage(&self) -> Result<&dyn Storage> {
        self.facets
            .iter()
            .find_map(|f| f.storage())
            .ok_or_else(|| Error::Internal(format!("chroot {} has no storage facet", self.name)))
    }

    /// The storage type name, e.g. `directory` or `lvm-snapshot`.
    pub fn chroot_type(&self) -> &'static str {
        self.facets
            .iter()
            .find_map(|f| f.storage().map(|_| f.name()))
            .unwrap_or("unknown")
    }

    pub fn is_session(&self) -> bool {
        self.has_facet::<SessionFacet>()
    }

    /// Union of the session flags contributed by every facet.
    pub fn session_flags(&self) -> SessionFlags {
        self.facets
            .iter()
            .fold(SessionFlags::empty(), |flags, f| {
                flags | f.session_flags(self)
            })
    }

    /// The on-host path of the chroot root: the mount location once one is
    /// assigned, otherwise the storage source itself.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(location) = &self.mount_location {
            return Ok(location.clone());
        }
        Ok(self.storage()?.path(self))
    }

    /// Variables describing this chroot, contributed to setup scripts and
    /// entered commands.
    pub fn setup_env(&self, env: &mut Environment) {
        env.add("CHROOT_NAME", self.name.clone());
        env.add("CHROOT_TYPE", self.chroot_type());
        if let Some(description) = &self.description {
            env.add("CHROOT_DESCRIPTION", description.clone());
        }
        if let Some(location) = &self.mount_location {
            env.add("CHROOT_MOUNT_LOCATION", location.display().to_string());
        }
        if let Ok(path) = self.path() {
            env.add("CHROOT_PATH", path.display().to_string());
        }
        env.add("CHROOT_PROFILE", self.profile.clone());
        for facet in &self.facets {
            facet.setup_env(self, env);
        }
    }

    /// Produce a running-session clone of this chroot: identity renamed to
    /// the session id, a session facet attached, and storage identifiers
    /// rewritten for the session.
    pub fn clone_session(
        &self,
        session_id: &str,
        alias: &str,
        user: &str,
        root: bool,
    ) -> Result<Chroot> {
        if !self.session_flags().contains(SessionFlags::CREATE) {
            return Err(Error::BadOperation {
                chroot: self.name.clone(),
                operation: "clone-session",
            });
        }

        let mut session = self.clone();
        session.name = session_id.to_string();
        session.aliases.clear();
        session.mount_location = Some(paths::mount_dir().join(session_id));
        session.remove_facet(facet::source_clonable::FACET_NAME);

        let mut session_facet = SessionFacet::new(&self.name, alias);
        session_facet.user = user.to_string();
        session_facet.root = root;
        session.add_facet(Box::new(session_facet));

        let original_name = self.name.clone();
        for facet in &mut session.facets {
            facet.clone_session_setup(&original_name, session_id);
        }

        Ok(session)
    }

    /// Produce the writable source branch of a snapshot-backed chroot.
    pub fn clone_source(&self) -> Result<Chroot> {
        if !self.session_flags().contains(SessionFlags::SOURCE) {
            return Err(Error::BadOperation {
                chroot: self.name.clone(),
                operation: "clone-source",
            });
        }

        let mut source = self.clone();
        source.name = format!("source:{}", self.name);
        source.aliases = self
            .aliases
            .iter()
            .map(|alias| format!("source:{alias}"))
            .collect();
        if let Some(description) = &self.description {
            source.description = Some(format!("{description} (source chroot)"));
        }

        if let Some(clonable) = self.facet::<SourceClonable>() {
            clonable.apply_policy(&mut source);
        }
        for facet in &self.facets {
            facet.clone_source_setup(self, &mut source)?;
        }
        source.remove_facet(facet::source_clonable::FACET_NAME);
        source.add_facet(Box::new(Source::new()));

        Ok(source)
    }

    /// All keys this chroot's envelope and facets consume.
    pub fn used_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = ENVELOPE_KEYS.to_vec();
        for facet in &self.facets {
            keys.extend_from_slice(facet.used_keys());
        }
        keys
    }

    /// Deserialise one keyfile section into a chroot. `is_session` attaches
    /// and populates a session facet, as used for the sessions directory.
    pub fn from_keyfile(section: &str, keyfile: &Keyfile, is_session: bool) -> Result<Chroot> {
        let file = keyfile.path().to_path_buf();
        let chroot_type = keyfile
            .get_value(section, "type")
            .ok_or_else(|| Error::ConfigValidate {
                file: file.clone(),
                section: section.to_string(),
                reason: "missing mandatory key 'type'".to_string(),
            })?
            .to_string();

        let storage = facet::factory::create(&chroot_type)
            .filter(|f| f.storage().is_some())
            .ok_or_else(|| Error::ConfigValidate {
                file: file.clone(),
                section: section.to_string(),
                reason: format!("unknown chroot type '{chroot_type}'"),
            })?;

        let mut chroot = Chroot::new(section);
        chroot.description = keyfile
            .get_localized(section, "description")
            .map(str::to_string);
        chroot.aliases = keyfile.get_list(section, "aliases");
        chroot.users = keyfile.get_list(section, "users");
        chroot.groups = keyfile.get_list(section, "groups");
        chroot.root_users = keyfile.get_list(section, "root-users");
        chroot.root_groups = keyfile.get_list(section, "root-groups");
        if let Some(profile) = keyfile
            .get_value(section, "profile")
            .or_else(|| keyfile.get_value(section, "script-config"))
        {
            chroot.profile = profile.to_string();
        }
        chroot.command_prefix = keyfile.get_list(section, "command-prefix");
        if let Some(filter) = keyfile.get_value(section, "environment-filter") {
            regex::Regex::new(filter).map_err(|err| Error::ConfigValidate {
                file: file.clone(),
                section: section.to_string(),
                reason: format!("environment-filter: {err}"),
            })?;
            chroot.environment_filter = filter.to_string();
        }
        if let Some(preserve) = keyfile.get::<bool>(section, "preserve-environment")? {
            chroot.preserve_environment = preserve;
        }
        chroot.default_shell = keyfile
            .get_value(section, "default-shell")
            .map(str::to_string);

        chroot.add_facet(storage);
        facet::install_optional(&mut chroot, section, keyfile)?;

        for facet in &mut chroot.facets {
            facet.set_keyfile(section, keyfile)?;
        }
        facet::install_capabilities(&mut chroot);

        if is_session {
            let mut session_facet = SessionFacet::new(section, section);
            session_facet.set_keyfile(section, keyfile)?;
            chroot.add_facet(Box::new(session_facet));
            chroot.mount_location = Some(paths::mount_dir().join(section));
        }

        Ok(chroot)
    }

    /// Serialise this chroot as one keyfile section.
    pub fn to_keyfile(&self, keyfile: &mut Keyfile) {
        let section = self.name.as_str();
        keyfile.set_value(section, "type", self.chroot_type());
        if let Some(description) = &self.description {
            keyfile.set_value(section, "description", description);
        }
        keyfile.set_list(section, "aliases", &self.aliases);
        keyfile.set_list(section, "users", &self.users);
        keyfile.set_list(section, "groups", &self.groups);
        keyfile.set_list(section, "root-users", &self.root_users);
        keyfile.set_list(section, "root-groups", &self.root_groups);
        if self.profile != "default" {
            keyfile.set_value(section, "profile", &self.profile);
        }
        keyfile.set_list(section, "command-prefix", &self.command_prefix);
        if self.environment_filter != crate::environment::DEFAULT_FILTER {
            keyfile.set_value(section, "environment-filter", &self.environment_filter);
        }
        if self.preserve_environment {
            keyfile.set_value(section, "preserve-environment", "true");
        }
        if let Some(shell) = &self.default_shell {
            keyfile.set_value(section, "default-shell", shell);
        }
        for facet in &self.facets {
            facet.get_keyfile(section, keyfile);
        }
    }

    /// Membership check helpers for the authorisation policy.
    pub fn user_allowed(&self, user: &str, user_groups: &[String]) -> bool {
        self.users.iter().any(|u| u == user)
            || self
                .groups
                .iter()
                .any(|g| user_groups.iter().any(|ug| ug == g))
    }

    pub fn root_allowed(&self, user: &str, user_groups: &[String]) -> bool {
        self.root_users.iter().any(|u| u == user)
            || self
                .root_groups
                .iter()
                .any(|g| user_groups.iter().any(|ug| ug == g))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;

    use super::*;
    use crate::error::ErrorKind;

    fn load(content: &str) -> Result<Chroot> {
        crate::init();
        let keyfile = Keyfile::parse(content, Path::new("test.conf"))?;
        let section = keyfile
            .sections()
            .next()
            .map(|(name, _)| name.to_string())
            .expect("one section");
        Ok(Chroot::from_keyfile(&section, &keyfile, false)?)
    }

    #[test]
    fn directory_chroot_has_storage_and_session_support() -> Result<()> {
        let chroot = load("[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n")?;
        assert_eq!(chroot.chroot_type(), "directory");
        assert_eq!(chroot.path()?, PathBuf::from("/srv/chroot/sid"));
        assert!(chroot.session_flags().contains(SessionFlags::CREATE));
        assert!(!chroot.is_session());
        Ok(())
    }

    #[test]
    fn missing_type_is_a_validation_error() {
        crate::init();
        let keyfile = Keyfile::parse("[sid]\ndirectory=/srv\n", Path::new("t.conf")).unwrap();
        let err = Chroot::from_keyfile("sid", &keyfile, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigValidate);
    }

    #[test]
    fn plain_chroot_has_no_session_support() -> Result<()> {
        let chroot = load("[oldstable]\ntype=plain\ndirectory=/srv/chroot/oldstable\n")?;
        assert_eq!(chroot.session_flags(), SessionFlags::empty());
        assert!(!chroot.run_setup_scripts);
        assert!(chroot.clone_session("abc", "oldstable", "joe", false).is_err());
        Ok(())
    }

    #[test]
    fn clone_session_attaches_session_facet() -> Result<()> {
        let chroot = load("[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n")?;
        let session = chroot.clone_session("0123abcd", "unstable", "joe", false)?;
        assert_eq!(session.name, "0123abcd");
        assert!(session.is_session());
        assert!(session.aliases.is_empty());

        let facet = session.facet::<SessionFacet>().expect("session facet");
        assert_eq!(facet.original_name, "sid");
        assert_eq!(facet.selected_name, "unstable");
        assert_eq!(facet.user, "joe");
        assert!(session.session_flags().contains(SessionFlags::PURGE));
        Ok(())
    }

    #[test]
    fn clone_source_requires_source_support() -> Result<()> {
        let chroot = load("[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n")?;
        let err = chroot.clone_source().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadOperation);
        Ok(())
    }

    #[test]
    fn snapshot_chroot_clones_a_source_branch() -> Result<()> {
        let chroot = load(
            "[snap]\ntype=lvm-snapshot\ndevice=/dev/vg/chroot_snap\n\
             lvm-snapshot-options=--size 2G\nsource-users=rleigh\n",
        )?;
        assert!(chroot.session_flags().contains(SessionFlags::SOURCE));

        let source = chroot.clone_source()?;
        assert_eq!(source.name, "source:snap");
        assert_eq!(source.users, vec!["rleigh".to_string()]);
        assert_eq!(source.chroot_type(), "block-device");
        assert!(!source.session_flags().contains(SessionFlags::SOURCE));
        Ok(())
    }

    #[test]
    fn used_keys_cover_declared_configuration() -> Result<()> {
        let chroot = load("[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n")?;
        let keys = chroot.used_keys();
        assert!(keys.contains(&"type"));
        assert!(keys.contains(&"directory"));
        assert!(keys.contains(&"aliases"));
        Ok(())
    }

    #[test]
    fn serialise_round_trip() -> Result<()> {
        let chroot = load(
            "[sid]\ntype=directory\ndirectory=/srv/chroot/sid\n\
             description=Debian unstable\naliases=unstable,default\ngroups=sbuild\n",
        )?;
        let mut keyfile = Keyfile::new();
        chroot.to_keyfile(&mut keyfile);

        let reparsed = Keyfile::parse(&keyfile.serialise(), Path::new("round.conf"))?;
        let again = Chroot::from_keyfile("sid", &reparsed, false)?;
        assert_eq!(again.description.as_deref(), Some("Debian unstable"));
        assert_eq!(again.aliases, vec!["unstable", "default"]);
        assert_eq!(again.groups, vec!["sbuild"]);
        assert_eq!(again.chroot_type(), "directory");
        Ok(())
    }
}

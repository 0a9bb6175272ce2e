//! Authentication and authorisation of the calling user.
//!
//! The engine asks the chroot's access policy what level of credentials
//! the caller needs, then drives an [`Authenticator`] through its
//! start/authenticate/stop lifecycle. Failures are audited.

pub mod null;
#[cfg(feature = "pam")]
pub mod pam;

use std::fmt::Debug;
use std::path::PathBuf;

use nix::unistd::{getgroups, Group, User};

use crate::chroot::Chroot;
use crate::environment::Environment;
use crate::error::{Error, Result};

/// The credential level required to enter a chroot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No credentials needed.
    None,
    /// The target user's credentials are needed.
    User,
    /// Access is denied outright.
    Fail,
}

/// Common start/authenticate/stop contract over the PAM and null
/// implementations.
pub trait Authenticator: Debug {
    /// The target user.
    fn user(&self) -> &str;
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;
    fn home(&self) -> PathBuf;
    fn shell(&self) -> String;

    /// The calling (real) user.
    fn ruser(&self) -> &str;
    fn ruid(&self) -> u32;

    fn start(&mut self) -> Result<()>;
    fn authenticate(&mut self, status: AuthStatus) -> Result<()>;
    fn stop(&mut self) -> Result<()>;

    /// Environment contributed by the authentication stack.
    fn auth_environment(&self) -> Environment;
}

/// Identity details of a user resolved from the password database.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    pub shell: PathBuf,
}

impl UserInfo {
    pub fn from_name(name: &str) -> Result<Self> {
        let user = User::from_name(name)
            .ok()
            .flatten()
            .ok_or_else(|| Error::Authentication {
                user: name.to_string(),
                reason: "unknown user".to_string(),
            })?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
            shell: user.shell,
        })
    }

    pub fn from_uid(uid: u32) -> Result<Self> {
        let user = User::from_uid(nix::unistd::Uid::from_raw(uid))
            .ok()
            .flatten()
            .ok_or_else(|| Error::Authentication {
                user: format!("uid {uid}"),
                reason: "unknown user".to_string(),
            })?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
            shell: user.shell,
        })
    }
}

/// The names of the groups the current process belongs to.
pub fn caller_groups() -> Vec<String> {
    let Ok(gids) = getgroups() else {
        return Vec::new();
    };
    gids.into_iter()
        .filter_map(|gid| Group::from_gid(gid).ok().flatten())
        .map(|group| group.name)
        .collect()
}

/// Decide the credential level `ruser` needs to enter `chroot` as `user`.
///
/// Root enters anywhere; a caller on the access list enters as themselves
/// without credentials and as anyone else with the target's credentials;
/// root entry is free for callers on the root access list; everyone else
/// is denied.
pub fn required_status(
    chroot: &Chroot,
    ruser: &str,
    ruid: u32,
    ruser_groups: &[String],
    user: &str,
) -> AuthStatus {
    if ruid == 0 {
        return AuthStatus::None;
    }
    if ruser == user {
        if chroot.user_allowed(ruser, ruser_groups) {
            return AuthStatus::None;
        }
        if user == "root" && chroot.root_allowed(ruser, ruser_groups) {
            return AuthStatus::None;
        }
        return AuthStatus::Fail;
    }
    if user == "root" && chroot.root_allowed(ruser, ruser_groups) {
        return AuthStatus::None;
    }
    if chroot.user_allowed(ruser, ruser_groups) {
        return AuthStatus::User;
    }
    AuthStatus::Fail
}

/// Write the audit trail entry for a denied or failed authentication.
pub fn audit_failure(ruser: &str, user: &str, chroot: &str) {
    tracing::warn!(
        target: "audit",
        ruser,
        user,
        chroot,
        "access denied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroot_with_policy(users: &[&str], groups: &[&str], root_groups: &[&str]) -> Chroot {
        let mut chroot = Chroot::new("sid");
        chroot.users = users.iter().map(|s| s.to_string()).collect();
        chroot.groups = groups.iter().map(|s| s.to_string()).collect();
        chroot.root_groups = root_groups.iter().map(|s| s.to_string()).collect();
        chroot
    }

    #[test]
    fn root_caller_needs_nothing() {
        let chroot = chroot_with_policy(&[], &[], &[]);
        assert_eq!(
            required_status(&chroot, "root", 0, &[], "anyone"),
            AuthStatus::None
        );
    }

    #[test]
    fn listed_user_enters_as_self_without_credentials() {
        let chroot = chroot_with_policy(&["joe"], &[], &[]);
        assert_eq!(
            required_status(&chroot, "joe", 1000, &[], "joe"),
            AuthStatus::None
        );
    }

    #[test]
    fn group_membership_grants_access() {
        let chroot = chroot_with_policy(&[], &["sbuild"], &[]);
        let groups = vec!["users".to_string(), "sbuild".to_string()];
        assert_eq!(
            required_status(&chroot, "joe", 1000, &groups, "joe"),
            AuthStatus::None
        );
    }

    #[test]
    fn switching_user_needs_credentials() {
        let chroot = chroot_with_policy(&["joe"], &[], &[]);
        assert_eq!(
            required_status(&chroot, "joe", 1000, &[], "build"),
            AuthStatus::User
        );
    }

    #[test]
    fn root_entry_via_root_groups_is_free() {
        let chroot = chroot_with_policy(&[], &[], &["admin"]);
        let groups = vec!["admin".to_string()];
        assert_eq!(
            required_status(&chroot, "joe", 1000, &groups, "root"),
            AuthStatus::None
        );
    }

    #[test]
    fn unlisted_caller_is_denied() {
        let chroot = chroot_with_policy(&["alice"], &[], &[]);
        assert_eq!(
            required_status(&chroot, "joe", 1000, &[], "joe"),
            AuthStatus::Fail
        );
        assert_eq!(
            required_status(&chroot, "joe", 1000, &[], "alice"),
            AuthStatus::Fail
        );
    }
}

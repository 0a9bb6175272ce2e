//! The no-op authenticator: used when credentials are never needed, and
//! the fallback when PAM support is not compiled in. It can verify
//! identity but has no way to check credentials, so any request for them
//! fails.

use std::path::PathBuf;

use crate::environment::Environment;
use crate::error::{Error, Result};

use super::{AuthStatus, Authenticator, UserInfo};

#[derive(Debug)]
pub struct NullAuth {
    #[allow(dead_code)]
    service: String,
    user: UserInfo,
    ruser: UserInfo,
}

impl NullAuth {
    pub fn new(service: &str, target_user: &str) -> Result<Self> {
        let ruid = nix::unistd::getuid().as_raw();
        Ok(Self {
            service: service.to_string(),
            user: UserInfo::from_name(target_user)?,
            ruser: UserInfo::from_uid(ruid)?,
        })
    }
}

impl Authenticator for NullAuth {
    fn user(&self) -> &str {
        &self.user.name
    }

    fn uid(&self) -> u32 {
        self.user.uid
    }

    fn gid(&self) -> u32 {
        self.user.gid
    }

    fn home(&self) -> PathBuf {
        self.user.home.clone()
    }

    fn shell(&self) -> String {
        self.user.shell.display().to_string()
    }

    fn ruser(&self) -> &str {
        &self.ruser.name
    }

    fn ruid(&self) -> u32 {
        self.ruser.uid
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn authenticate(&mut self, status: AuthStatus) -> Result<()> {
        match status {
            AuthStatus::None => Ok(()),
            // Root may switch user without credentials; nobody else can,
            // because there is no mechanism to check a password with.
            AuthStatus::User if self.ruser.uid == 0 => Ok(()),
            AuthStatus::User => Err(Error::Authentication {
                user: self.user.name.clone(),
                reason: "no authentication mechanism available".to_string(),
            }),
            AuthStatus::Fail => Err(Error::Authorisation {
                ruser: self.ruser.name.clone(),
                user: self.user.name.clone(),
            }),
        }
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn auth_environment(&self) -> Environment {
        Environment::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller_name() -> String {
        nix::unistd::User::from_uid(nix::unistd::getuid())
            .unwrap()
            .unwrap()
            .name
    }

    #[test]
    fn resolves_caller_and_target() {
        let name = caller_name();
        let auth = NullAuth::new("schroot", &name).unwrap();
        assert_eq!(auth.user(), name);
        assert_eq!(auth.ruser(), name);
        assert_eq!(auth.ruid(), nix::unistd::getuid().as_raw());
    }

    #[test]
    fn unknown_target_user_fails() {
        let err = NullAuth::new("schroot", "no-such-user-exists").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authentication);
    }

    #[test]
    fn no_credentials_needed_succeeds() {
        let name = caller_name();
        let mut auth = NullAuth::new("schroot", &name).unwrap();
        auth.start().unwrap();
        auth.authenticate(AuthStatus::None).unwrap();
        auth.stop().unwrap();
    }

    #[test]
    fn denied_access_is_an_authorisation_error() {
        let name = caller_name();
        let mut auth = NullAuth::new("schroot", &name).unwrap();
        let err = auth.authenticate(AuthStatus::Fail).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorisation);
    }

    #[test]
    fn credential_requests_fail_for_non_root() {
        if nix::unistd::getuid().is_root() {
            return;
        }
        let name = caller_name();
        let mut auth = NullAuth::new("schroot", &name).unwrap();
        let err = auth.authenticate(AuthStatus::User).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authentication);
    }
}

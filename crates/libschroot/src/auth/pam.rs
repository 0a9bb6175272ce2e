//! PAM-backed authentication, compiled in with the `pam` cargo feature.
//!
//! The conversation is non-graphical: the target user's password is read
//! from the controlling terminal with echo disabled.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use nix::sys::termios::{self, LocalFlags, SetArg};

use crate::environment::Environment;
use crate::error::{Error, Result};

use super::{AuthStatus, Authenticator, UserInfo};

#[derive(Debug)]
pub struct PamAuth {
    service: String,
    user: UserInfo,
    ruser: UserInfo,
    open: bool,
}

impl PamAuth {
    pub fn new(service: &str, target_user: &str) -> Result<Self> {
        let ruid = nix::unistd::getuid().as_raw();
        Ok(Self {
            service: service.to_string(),
            user: UserInfo::from_name(target_user)?,
            ruser: UserInfo::from_uid(ruid)?,
            open: false,
        })
    }

    fn check_credentials(&self) -> Result<()> {
        let password = read_password(&format!("{}'s password: ", self.user.name))
            .map_err(|err| Error::Authentication {
                user: self.user.name.clone(),
                reason: format!("failed to read password: {err}"),
            })?;

        let mut authenticator = pam::Authenticator::with_password(&self.service)
            .map_err(|err| Error::Authentication {
                user: self.user.name.clone(),
                reason: format!("failed to initialise PAM: {err}"),
            })?;
        authenticator
            .get_handler()
            .set_credentials(self.user.name.clone(), password);
        authenticator
            .authenticate()
            .map_err(|err| Error::Authentication {
                user: self.user.name.clone(),
                reason: format!("{err}"),
            })?;
        authenticator
            .open_session()
            .map_err(|err| Error::Authentication {
                user: self.user.name.clone(),
                reason: format!("failed to open session: {err}"),
            })?;
        Ok(())
    }
}

impl Authenticator for PamAuth {
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
        self.open = true;
        Ok(())
    }

    fn authenticate(&mut self, status: AuthStatus) -> Result<()> {
        match status {
            AuthStatus::None => Ok(()),
            AuthStatus::User if self.ruser.uid == 0 => Ok(()),
            AuthStatus::User => self.check_credentials(),
            AuthStatus::Fail => Err(Error::Authorisation {
                ruser: self.ruser.name.clone(),
                user: self.user.name.clone(),
            }),
        }
    }

    fn stop(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn auth_environment(&self) -> Environment {
        // PAM modules may contribute variables via pam_env; the pam crate
        // does not expose them, so only identity is passed through.
        let mut env = Environment::new();
        env.add("PAM_SERVICE", self.service.clone());
        env
    }
}

/// Prompt on the controlling terminal and read a line with echo disabled.
fn read_password(prompt: &str) -> std::io::Result<String> {
    let mut tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")?;
    tty.write_all(prompt.as_bytes())?;
    tty.flush()?;

    let saved = termios::tcgetattr(&tty)?;
    let mut silent = saved.clone();
    silent.local_flags.remove(LocalFlags::ECHO);
    termios::tcsetattr(&tty, SetArg::TCSANOW, &silent)?;

    let mut line = String::new();
    let result = std::io::BufReader::new(&tty).read_line(&mut line);
    termios::tcsetattr(&tty, SetArg::TCSANOW, &saved)?;
    tty.write_all(b"\n")?;
    result?;

    Ok(line.trim_end_matches('\n').to_string())
}

//! Error types shared across the library.
//!
//! Every failure the library can surface carries one of the stable kinds
//! below. Front-ends render failures on stderr as
//! `<program>: <chroot-or-session>: <kind>: <reason>`, where the kind comes
//! from [`Error::kind`] and the reason from the `Display` impl.

use std::fmt;
use std::path::PathBuf;

/// Stable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigParse,
    ConfigValidate,
    DuplicateName,
    UnknownChroot,
    BadOperation,
    Authentication,
    Authorisation,
    UserSwitch,
    Lock,
    Unlock,
    Mount,
    Umount,
    Snapshot,
    Script,
    ChrootEnter,
    ChildExec,
    ChildSignal,
    SessionCreate,
    SessionWrite,
    SessionMissing,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigParse => "CONFIG_PARSE",
            ErrorKind::ConfigValidate => "CONFIG_VALIDATE",
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::UnknownChroot => "UNKNOWN_CHROOT",
            ErrorKind::BadOperation => "BAD_OPERATION",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Authorisation => "AUTHORISATION",
            ErrorKind::UserSwitch => "USER_SWITCH",
            ErrorKind::Lock => "LOCK",
            ErrorKind::Unlock => "UNLOCK",
            ErrorKind::Mount => "MOUNT",
            ErrorKind::Umount => "UMOUNT",
            ErrorKind::Snapshot => "SNAPSHOT",
            ErrorKind::Script => "SCRIPT",
            ErrorKind::ChrootEnter => "CHROOT_ENTER",
            ErrorKind::ChildExec => "CHILD_EXEC",
            ErrorKind::ChildSignal => "CHILD_SIGNAL",
            ErrorKind::SessionCreate => "SESSION_CREATE",
            ErrorKind::SessionWrite => "SESSION_WRITE",
            ErrorKind::SessionMissing => "SESSION_MISSING",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{file}: line {line}: {reason}")]
    ConfigParse {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{file} [{section}]: {reason}")]
    ConfigValidate {
        file: PathBuf,
        section: String,
        reason: String,
    },

    #[error("{name}: defined by [{first}] and [{second}]")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("{0}: no such chroot")]
    UnknownChroot(String),

    #[error("{chroot}: {operation} is not supported by this chroot type")]
    BadOperation {
        chroot: String,
        operation: &'static str,
    },

    #[error("{user}: authentication failed: {reason}")]
    Authentication { user: String, reason: String },

    #[error("{ruser} is not permitted to access the chroot as {user}")]
    Authorisation { ruser: String, user: String },

    #[error("{ruser} may not switch to user {user}")]
    UserSwitch { ruser: String, user: String },

    #[error("{path}: failed to acquire lock: {reason}")]
    Lock { path: PathBuf, reason: String },

    #[error("{path}: failed to release lock: {reason}")]
    Unlock { path: PathBuf, reason: String },

    #[error("{target}: mount failed with status {status}")]
    Mount { target: PathBuf, status: i32 },

    #[error("{target}: unmount failed with status {status}")]
    Umount { target: PathBuf, status: i32 },

    #[error("{device}: snapshot operation failed with status {status}")]
    Snapshot { device: String, status: i32 },

    #[error("{script}: setup script failed with status {status}")]
    Script { script: PathBuf, status: i32 },

    #[error("{path}: failed to enter chroot: {source}")]
    ChrootEnter {
        path: PathBuf,
        source: nix::Error,
    },

    #[error("{command}: failed to execute: {source}")]
    ChildExec {
        command: String,
        source: std::io::Error,
    },

    #[error("{command}: terminated by signal {signal}")]
    ChildSignal { command: String, signal: i32 },

    #[error("{id}: failed to create session: {source}")]
    SessionCreate {
        id: String,
        source: std::io::Error,
    },

    #[error("{path}: failed to write session file: {source}")]
    SessionWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}: no such session")]
    SessionMissing(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigParse { .. } => ErrorKind::ConfigParse,
            Error::ConfigValidate { .. } => ErrorKind::ConfigValidate,
            Error::DuplicateName { .. } => ErrorKind::DuplicateName,
            Error::UnknownChroot(_) => ErrorKind::UnknownChroot,
            Error::BadOperation { .. } => ErrorKind::BadOperation,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Authorisation { .. } => ErrorKind::Authorisation,
            Error::UserSwitch { .. } => ErrorKind::UserSwitch,
            Error::Lock { .. } => ErrorKind::Lock,
            Error::Unlock { .. } => ErrorKind::Unlock,
            Error::Mount { .. } => ErrorKind::Mount,
            Error::Umount { .. } => ErrorKind::Umount,
            Error::Snapshot { .. } => ErrorKind::Snapshot,
            Error::Script { .. } => ErrorKind::Script,
            Error::ChrootEnter { .. } => ErrorKind::ChrootEnter,
            Error::ChildExec { .. } => ErrorKind::ChildExec,
            Error::ChildSignal { .. } => ErrorKind::ChildSignal,
            Error::SessionCreate { .. } => ErrorKind::SessionCreate,
            Error::SessionWrite { .. } => ErrorKind::SessionWrite,
            Error::SessionMissing(_) => ErrorKind::SessionMissing,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(ErrorKind::ConfigParse.as_str(), "CONFIG_PARSE");
        assert_eq!(ErrorKind::UserSwitch.as_str(), "USER_SWITCH");
        assert_eq!(ErrorKind::SessionMissing.as_str(), "SESSION_MISSING");
    }

    #[test]
    fn error_maps_to_kind() {
        let err = Error::UnknownChroot("sid".into());
        assert_eq!(err.kind(), ErrorKind::UnknownChroot);
        assert_eq!(err.to_string(), "sid: no such chroot");
    }
}

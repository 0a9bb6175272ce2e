//! The session lifecycle engine.
//!
//! One invocation drives one operation through the per-chroot state
//! machine `IDLE → PREPARED → MOUNTED → ACTIVE → UNMOUNTED → CLEANED`.
//! Resources are acquired in order (session file, setup scripts, storage
//! lock, storage, union), each acquisition registers its release, and the
//! release stack runs in reverse on both the success and the failure
//! path. The first error wins; teardown errors are logged but never mask
//! the cause.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

#[cfg(not(feature = "pam"))]
use crate::auth::null::NullAuth;
#[cfg(feature = "pam")]
use crate::auth::pam::PamAuth;
use crate::auth::{audit_failure, caller_groups, required_status, AuthStatus, Authenticator, UserInfo};
use crate::chroot::facet::fsunion::FsUnion;
use crate::chroot::facet::mountable::Mountable;
use crate::chroot::facet::personality::Personality as PersonalityFacet;
use crate::chroot::facet::storage::{ReleaseAction, SetupContext};
use crate::chroot::{Chroot, SessionFlags, SetupType};
use crate::config::ConfigStore;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::mounts;
use crate::paths;
use crate::run_parts::RunParts;
use crate::signals::SignalState;
use crate::syscall::{ExecSpec, Syscall};
use crate::util;

use super::lock::{StorageLock, DEFAULT_LOCK_TIMEOUT};
use super::Session;

/// What the caller asked the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Run a command or shell, creating and purging a transient session.
    Run,
    /// Create and persist a session.
    Begin,
    /// Re-attach a persisted session whose mount was lost.
    Recover,
    /// Run in an existing session.
    RunSession,
    /// Purge a session.
    End,
}

/// Per-front-end policy.
#[derive(Debug, Clone)]
pub struct Policy {
    pub allow_user_switching: bool,
    /// Command directories equal login directories.
    pub force_login_directories: bool,
    /// The authentication service name.
    pub service: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_user_switching: true,
            force_login_directories: false,
            service: "schroot".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub operation: Operation,
    /// Chroot name, alias, `session:<id>` reference or session id,
    /// depending on the operation.
    pub chroot: String,
    /// Empty means a login shell.
    pub command: Vec<String>,
    pub user: Option<String>,
    pub directory: Option<PathBuf>,
    pub preserve_environment: bool,
    pub session_name: Option<String>,
}

impl Request {
    pub fn new(operation: Operation, chroot: &str) -> Self {
        Self {
            operation,
            chroot: chroot.to_string(),
            command: Vec::new(),
            user: None,
            directory: None,
            preserve_environment: false,
            session_name: None,
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    /// Exit status to report: the child's for executed commands.
    pub status: i32,
    pub session_id: Option<String>,
}

pub struct Engine<'a> {
    config: &'a ConfigStore,
    syscall: &'a dyn Syscall,
    policy: Policy,
    signals: Option<SignalState>,
    pub lock_timeout: Duration,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a ConfigStore, syscall: &'a dyn Syscall) -> Self {
        Self {
            config,
            syscall,
            policy: Policy::default(),
            signals: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Install SIGINT/SIGTERM/SIGHUP handlers for cooperative
    /// cancellation.
    pub fn install_signal_handlers(&mut self) -> std::io::Result<()> {
        self.signals = Some(SignalState::install()?);
        Ok(())
    }

    pub fn run(&self, request: &Request) -> Result<Outcome> {
        match request.operation {
            Operation::Run => {
                let chroot = self.config.find_or_session(&request.chroot)?;
                if chroot.is_session() {
                    let target = self.target_user(request)?;
                    self.check_user_switch(&target)?;
                    let status =
                        self.activate(&chroot, &chroot.name.clone(), request, &target)?;
                    return Ok(Outcome {
                        status,
                        session_id: Some(chroot.name),
                    });
                }
                if chroot.session_flags().contains(SessionFlags::CREATE) {
                    self.lifecycle(&chroot, request, false)
                } else {
                    self.run_direct(&chroot, request)
                }
            }
            Operation::Begin => {
                let chroot = self
                    .config
                    .find(&request.chroot)
                    .cloned()
                    .ok_or_else(|| Error::UnknownChroot(request.chroot.clone()))?;
                self.lifecycle(&chroot, request, true)
            }
            Operation::Recover => self.recover_session(request),
            Operation::RunSession => self.run_in_session(request),
            Operation::End => self.end_session(request),
        }
    }

    // ---- operations ------------------------------------------------------

    /// Directly enter a chroot with no session support: no scripts, no
    /// mounts, no persisted state.
    fn run_direct(&self, chroot: &Chroot, request: &Request) -> Result<Outcome> {
        self.check_cancel()?;
        let target = self.target_user(request)?;
        self.check_user_switch(&target)?;
        let status = self.activate(chroot, &chroot.name, request, &target)?;
        Ok(Outcome {
            status,
            session_id: None,
        })
    }

    /// The full state machine for transient runs (`persist == false`) and
    /// `begin-session` (`persist == true`).
    fn lifecycle(&self, chroot: &Chroot, request: &Request, persist: bool) -> Result<Outcome> {
        self.check_cancel()?;
        let target = self.target_user(request)?;
        self.check_user_switch(&target)?;

        // ---- IDLE → PREPARED
        let id = match &request.session_name {
            Some(name) => {
                if !util::is_valid_session_name(name) {
                    return Err(Error::ConfigValidate {
                        file: paths::session_dir(),
                        section: name.clone(),
                        reason: "invalid session name".to_string(),
                    });
                }
                name.clone()
            }
            None => Session::generate_id(),
        };

        let session_chroot =
            chroot.clone_session(&id, &request.chroot, &target, target == "root")?;
        let location = session_chroot
            .mount_location
            .clone()
            .ok_or_else(|| Error::Internal("session has no mount location".to_string()))?;
        let mut session = Session::create(session_chroot)?;
        tracing::debug!(session = %id, chroot = %chroot.name, "session prepared");

        let mut ctx = SetupContext::new(self.syscall, &id, &location);
        let mut lock: Option<StorageLock> = None;
        let mut scripts_started = false;

        let run_result = self.advance(
            &mut session,
            request,
            &target,
            &mut ctx,
            &mut lock,
            &mut scripts_started,
            persist,
        );

        if persist && run_result.is_ok() {
            // The session stays mounted; the acquisitions outlive us.
            ctx.release.commit();
            if let Some(lock) = lock.take() {
                if let Err(err) = lock.unlock() {
                    tracing::warn!(%err, "failed to release storage lock");
                }
            }
            return Ok(Outcome {
                status: 0,
                session_id: Some(id),
            });
        }

        let ok = run_result.is_ok();
        let teardown_error =
            self.finish(&mut session, &mut ctx, lock.take(), scripts_started, &target, ok);

        match run_result {
            Ok(status) => match teardown_error {
                None => Ok(Outcome {
                    status,
                    session_id: None,
                }),
                Some(err) => Err(err),
            },
            Err(err) => {
                if let Some(teardown_err) = teardown_error {
                    tracing::warn!(%teardown_err, "teardown error after failure");
                }
                Err(err)
            }
        }
    }

    /// The forward path: PREPARED → MOUNTED → ACTIVE.
    #[allow(clippy::too_many_arguments)]
    fn advance(
        &self,
        session: &mut Session,
        request: &Request,
        target: &str,
        ctx: &mut SetupContext<'_>,
        lock: &mut Option<StorageLock>,
        scripts_started: &mut bool,
        persist: bool,
    ) -> Result<i32> {
        self.run_setup_scripts(session, SetupType::Start, true, target)?;
        *scripts_started = true;
        self.check_cancel()?;

        // ---- PREPARED → MOUNTED
        self.acquire_storage(session, ctx, lock)?;
        tracing::debug!(session = %session.id, "storage mounted");

        if persist {
            return Ok(0);
        }
        self.check_cancel()?;

        // ---- MOUNTED → ACTIVE
        let session_chroot = session.chroot.clone();
        self.activate(&session_chroot, &session.id, request, target)
    }

    fn run_in_session(&self, request: &Request) -> Result<Outcome> {
        self.check_cancel()?;
        let id = request
            .chroot
            .strip_prefix("session:")
            .unwrap_or(&request.chroot);
        let session = Session::load(id)?;
        let target = self.target_user(request)?;
        self.check_user_switch(&target)?;
        let status = self.activate(&session.chroot, &session.id, request, &target)?;
        Ok(Outcome {
            status,
            session_id: Some(session.id),
        })
    }

    fn recover_session(&self, request: &Request) -> Result<Outcome> {
        self.check_cancel()?;
        let id = request
            .chroot
            .strip_prefix("session:")
            .unwrap_or(&request.chroot);
        let mut session = Session::load(id)?;
        let target = self.target_user(request)?;

        let location = session
            .chroot
            .mount_location
            .clone()
            .unwrap_or_else(|| paths::mount_dir().join(id));
        std::fs::create_dir_all(&location)
            .map_err(|err| Error::Internal(format!("{}: {err}", location.display())))?;

        let mut ctx = SetupContext::new(self.syscall, id, &location);
        ctx.mount_device = session.mount_device();

        let mut lock: Option<StorageLock> = None;
        {
            let storage = session.chroot.storage()?;
            if let Some(path) = storage.lock_path(&session.chroot) {
                lock = Some(StorageLock::acquire(&path, self.lock_timeout)?);
            }
        }

        let result = (|| -> Result<()> {
            let mounted = mounts::mounts_under(&location)
                .map(|m| !m.is_empty())
                .unwrap_or(false);
            if !mounted {
                if let Some(device) = session.mount_device() {
                    let status = self
                        .syscall
                        .run_command(
                            "mount",
                            &[device, location.display().to_string()],
                        )
                        .map_err(|err| Error::Internal(format!("failed to run mount: {err}")))?;
                    if status != 0 {
                        return Err(Error::Mount {
                            target: location.clone(),
                            status,
                        });
                    }
                } else {
                    {
                        let storage = session.chroot.storage()?;
                        storage.setup(&session.chroot, &mut ctx)?;
                    }
                    if let Some(device) = ctx.mount_device.clone() {
                        session.set_mount_device(&device);
                    }
                }
            }
            self.run_setup_scripts(&session, SetupType::Recover, true, &target)?;
            session.save()
        })();

        ctx.release.commit();
        if let Some(lock) = lock {
            if let Err(err) = lock.unlock() {
                tracing::warn!(%err, "failed to release storage lock");
            }
        }

        result.map(|_| Outcome {
            status: 0,
            session_id: Some(id.to_string()),
        })
    }

    fn end_session(&self, request: &Request) -> Result<Outcome> {
        let id = request
            .chroot
            .strip_prefix("session:")
            .unwrap_or(&request.chroot);
        let mut session = Session::load(id)?;
        let target = self.target_user(request)?;

        let location = session
            .chroot
            .mount_location
            .clone()
            .unwrap_or_else(|| paths::mount_dir().join(id));
        let mut ctx = SetupContext::new(self.syscall, id, &location);
        ctx.mount_device = session.mount_device();

        let mut lock: Option<StorageLock> = None;
        let prepare: Result<()> = (|| -> Result<()> {
            {
                let storage = session.chroot.storage()?;
                if let Some(path) = storage.lock_path(&session.chroot) {
                    lock = Some(StorageLock::acquire(&path, self.lock_timeout)?);
                }
                storage.teardown(&session.chroot, &mut ctx)?;
            }
            // Anything still mounted below the session root is released
            // first; deepest mounts are pushed last so they pop first.
            if let Ok(mounted) = mounts::mounts_under(&location) {
                for mount in mounted.into_iter().rev() {
                    if mount != location {
                        ctx.release.push(ReleaseAction::Unmount(mount));
                    }
                }
            }
            Ok(())
        })();

        let mut first_error = prepare.err();

        if let Some(err) = ctx.release.run_reverse(self.syscall) {
            if first_error.is_none() {
                first_error = Some(err);
            } else {
                tracing::warn!(%err, "release error during session end");
            }
        }

        if let Err(err) = self.run_setup_scripts(
            &session,
            SetupType::Stop,
            first_error.is_none(),
            &target,
        ) {
            if first_error.is_none() {
                first_error = Some(err);
            } else {
                tracing::warn!(%err, "setup-stop error during session end");
            }
        }

        if let Some(lock) = lock {
            if let Err(err) = lock.unlock() {
                tracing::warn!(%err, "failed to release storage lock");
            }
        }

        session.set_purged(true);
        if let Err(err) = session.delete() {
            if first_error.is_none() {
                first_error = Some(err);
            } else {
                tracing::warn!(%err, "failed to delete session file");
            }
        }
        let _ = std::fs::remove_dir(&location);

        self.log_deferred_signals();
        match first_error {
            None => Ok(Outcome {
                status: 0,
                session_id: Some(id.to_string()),
            }),
            Some(err) => Err(err),
        }
    }

    // ---- state transitions ----------------------------------------------

    /// PREPARED → MOUNTED: lock the storage source, acquire the storage
    /// and any union, and record the mount device on the session.
    fn acquire_storage(
        &self,
        session: &mut Session,
        ctx: &mut SetupContext<'_>,
        lock: &mut Option<StorageLock>,
    ) -> Result<()> {
        {
            let storage = session.chroot.storage()?;
            if let Some(path) = storage.lock_path(&session.chroot) {
                *lock = Some(StorageLock::acquire(&path, self.lock_timeout)?);
            }
        }

        std::fs::create_dir_all(&ctx.mount_location)
            .map_err(|err| Error::Internal(format!("{}: {err}", ctx.mount_location.display())))?;

        {
            let storage = session.chroot.storage()?;
            storage.setup(&session.chroot, ctx)?;
        }
        if let Some(union) = session.chroot.facet::<FsUnion>().cloned() {
            union.setup(&session.chroot, ctx)?;
        }

        if let Some(device) = ctx.mount_device.clone() {
            session.set_mount_device(&device);
        }
        session.save()
    }

    /// MOUNTED → ACTIVE: authenticate, compose the environment and
    /// execute the command with dropped privileges.
    fn activate(
        &self,
        chroot: &Chroot,
        session_id: &str,
        request: &Request,
        target: &str,
    ) -> Result<i32> {
        let mut auth = self.authenticator(target)?;

        let status = required_status(
            chroot,
            auth.ruser(),
            auth.ruid(),
            &caller_groups(),
            auth.user(),
        );
        if status == AuthStatus::Fail {
            audit_failure(auth.ruser(), auth.user(), &chroot.name);
            return Err(Error::Authorisation {
                ruser: auth.ruser().to_string(),
                user: auth.user().to_string(),
            });
        }

        auth.start()?;
        if let Err(err) = auth.authenticate(status) {
            audit_failure(auth.ruser(), auth.user(), &chroot.name);
            let _ = auth.stop();
            return Err(err);
        }
        auth.stop()?;

        let spec = self.exec_spec(chroot, session_id, auth.as_ref(), request)?;
        tracing::debug!(
            session = session_id,
            program = %spec.program,
            uid = spec.uid,
            "executing command"
        );
        self.syscall.spawn(&spec, self.signals.as_ref())
    }

    /// The teardown half: UNMOUNTED → CLEANED, shared by the success and
    /// failure paths of transient sessions. Returns the first teardown
    /// error for the caller to surface or log.
    fn finish(
        &self,
        session: &mut Session,
        ctx: &mut SetupContext<'_>,
        lock: Option<StorageLock>,
        scripts_started: bool,
        target: &str,
        ok: bool,
    ) -> Option<Error> {
        let mut first: Option<Error> = None;

        // ---- ACTIVE → UNMOUNTED
        if let Some(err) = ctx.release.run_reverse(self.syscall) {
            first.get_or_insert(err);
        }

        // ---- UNMOUNTED → CLEANED
        if scripts_started {
            if let Err(err) = self.run_setup_scripts(session, SetupType::Stop, ok, target) {
                tracing::warn!(%err, "setup-stop scripts failed");
                first.get_or_insert(err);
            }
        }

        if let Some(lock) = lock {
            if let Err(err) = lock.unlock() {
                tracing::warn!(%err, "failed to release storage lock");
                first.get_or_insert(err);
            }
        }

        session.set_purged(true);
        if Session::exists(&session.id) {
            if let Err(err) = session.delete() {
                tracing::warn!(%err, "failed to delete session file");
                first.get_or_insert(err);
            }
        }
        if let Some(location) = &session.chroot.mount_location {
            let _ = std::fs::remove_dir(location);
        }

        self.log_deferred_signals();
        first
    }

    // ---- helpers ---------------------------------------------------------

    fn authenticator(&self, target: &str) -> Result<Box<dyn Authenticator>> {
        #[cfg(feature = "pam")]
        {
            Ok(Box::new(PamAuth::new(&self.policy.service, target)?))
        }
        #[cfg(not(feature = "pam"))]
        {
            Ok(Box::new(NullAuth::new(&self.policy.service, target)?))
        }
    }

    fn target_user(&self, request: &Request) -> Result<String> {
        match &request.user {
            Some(user) => Ok(user.clone()),
            None => {
                UserInfo::from_uid(nix::unistd::getuid().as_raw()).map(|user| user.name)
            }
        }
    }

    fn check_user_switch(&self, target: &str) -> Result<()> {
        let caller = UserInfo::from_uid(nix::unistd::getuid().as_raw())?;
        if caller.name != target && !self.policy.allow_user_switching {
            return Err(Error::UserSwitch {
                ruser: caller.name,
                user: target.to_string(),
            });
        }
        Ok(())
    }

    fn check_cancel(&self) -> Result<()> {
        if let Some(signals) = &self.signals {
            if signals.cancel_requested() {
                return Err(Error::Internal("interrupted by signal".to_string()));
            }
        }
        Ok(())
    }

    /// A signal arriving during teardown is logged and otherwise ignored.
    fn log_deferred_signals(&self) {
        if let Some(signals) = &self.signals {
            if signals.cancel_requested() {
                tracing::warn!("termination requested during cleanup; finishing first");
            }
        }
    }

    /// Run the setup scripts of the chroot's profile for `setup_type`.
    fn run_setup_scripts(
        &self,
        session: &Session,
        setup_type: SetupType,
        ok: bool,
        target: &str,
    ) -> Result<()> {
        let chroot = &session.chroot;
        if !chroot.run_setup_scripts {
            return Ok(());
        }
        let dir = paths::setup_script_dir(&chroot.profile);
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no setup script directory");
            return Ok(());
        }

        let mut env = Environment::new();
        env.add("PATH", "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin");
        chroot.setup_env(&mut env);
        env.add("SESSION_ID", session.id.clone());
        env.add("AUTH_USER", target);
        if let Some(location) = &chroot.mount_location {
            env.add("MOUNT_LOCATION", location.display().to_string());
        }
        if let Some(device) = session.mount_device() {
            env.add("MOUNT_DEVICE", device);
        }

        RunParts::new(&dir).run(
            &[
                setup_type.as_str().to_string(),
                if ok { "ok".to_string() } else { "fail".to_string() },
            ],
            &env,
        )
    }

    /// Assemble the command execution: root, directories, identity,
    /// environment.
    fn exec_spec(
        &self,
        chroot: &Chroot,
        session_id: &str,
        auth: &dyn Authenticator,
        request: &Request,
    ) -> Result<ExecSpec> {
        let mut root = chroot.path()?;
        if let Some(mountable) = chroot.facet::<Mountable>() {
            if let Some(location) = &mountable.location {
                root = root.join(location.trim_start_matches('/'));
            }
        }

        // Command: a login shell when none was given, else the prefix
        // followed by the command itself.
        let login_shell = request.command.is_empty();
        let (program, argv, command_string) = if login_shell {
            let shell = chroot
                .default_shell
                .clone()
                .unwrap_or_else(|| auth.shell());
            let arg0 = format!("-{}", util::basename(&shell));
            (shell.clone(), vec![arg0], shell)
        } else {
            let mut full = chroot.command_prefix.clone();
            full.extend(request.command.iter().cloned());
            let rendered = util::string_list_to_string(&full, " ");
            (full[0].clone(), full, rendered)
        };

        // Environment: everything with -p, a minimal terminal set
        // otherwise; then the filter, the synthesised login variables and
        // the session description.
        let preserve = request.preserve_environment || chroot.preserve_environment;
        let mut env = if preserve {
            Environment::from_process()
        } else {
            let process = Environment::from_process();
            let mut minimal = Environment::new();
            for key in ["TERM", "DISPLAY", "COLORTERM"] {
                if let Some(value) = process.get(key) {
                    minimal.add(key, value);
                }
            }
            minimal
        };

        let filter = Regex::new(&chroot.environment_filter)
            .map_err(|err| Error::Internal(format!("environment filter: {err}")))?;
        env.strip(&filter);

        let path = if auth.uid() == 0 {
            "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"
        } else {
            "/usr/local/bin:/usr/bin:/bin"
        };
        env.add("PATH", path);
        env.add("HOME", auth.home().display().to_string());
        env.add("USER", auth.user());
        env.add("LOGNAME", auth.user());
        env.add("SHELL", auth.shell());
        env.merge(&auth.auth_environment());

        let group = nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(auth.gid()))
            .ok()
            .flatten()
            .map(|g| g.name)
            .unwrap_or_else(|| auth.gid().to_string());

        env.add("SCHROOT_COMMAND", command_string);
        env.add("SCHROOT_USER", auth.user());
        env.add("SCHROOT_GROUP", group);
        env.add("SCHROOT_UID", auth.uid().to_string());
        env.add("SCHROOT_GID", auth.gid().to_string());
        env.add("SCHROOT_SESSION_ID", session_id);
        env.add("SCHROOT_CHROOT_NAME", original_name(chroot));
        env.add("SCHROOT_ALIAS_NAME", selected_name(chroot, &request.chroot));
        env.add("SCHROOT_CHROOT_TYPE", chroot.chroot_type());
        env.add("SCHROOT_MOUNT_LOCATION", root.display().to_string());
        env.add("SCHROOT_PATH", path);

        let directories = self.directories(request, &auth.home(), login_shell);
        let groups = supplementary_groups(auth.user(), auth.gid());

        let persona = chroot
            .facet::<PersonalityFacet>()
            .map(|p| p.persona)
            .unwrap_or_default();

        Ok(ExecSpec {
            root,
            directories,
            persona,
            uid: auth.uid(),
            gid: auth.gid(),
            groups,
            program,
            argv,
            env,
        })
    }

    /// The working directory candidates, in order. An explicit `-d` must
    /// succeed on its own; otherwise login shells use home then `/`, and
    /// commands additionally try the caller's working directory first.
    fn directories(
        &self,
        request: &Request,
        home: &std::path::Path,
        login_shell: bool,
    ) -> Vec<PathBuf> {
        if let Some(directory) = &request.directory {
            return vec![directory.clone()];
        }

        let mut directories = Vec::new();
        let use_login = login_shell || self.policy.force_login_directories;
        if !use_login {
            if let Ok(cwd) = std::env::current_dir() {
                directories.push(cwd);
            }
        }
        if !home.as_os_str().is_empty() {
            directories.push(home.to_path_buf());
        }
        directories.push(PathBuf::from("/"));
        directories
    }
}

fn original_name(chroot: &Chroot) -> String {
    chroot
        .facet::<crate::chroot::facet::session::Session>()
        .map(|f| f.original_name.clone())
        .unwrap_or_else(|| chroot.name.clone())
}

fn selected_name(chroot: &Chroot, requested: &str) -> String {
    chroot
        .facet::<crate::chroot::facet::session::Session>()
        .map(|f| f.selected_name.clone())
        .unwrap_or_else(|| requested.to_string())
}

fn supplementary_groups(user: &str, gid: u32) -> Vec<u32> {
    let Ok(name) = std::ffi::CString::new(user) else {
        return vec![gid];
    };
    nix::unistd::getgrouplist(&name, nix::unistd::Gid::from_raw(gid))
        .map(|groups| groups.into_iter().map(|g| g.as_raw()).collect())
        .unwrap_or_else(|_| vec![gid])
}

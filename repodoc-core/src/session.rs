//! Session state for one user of the pipeline.
//!
//! A [`Session`] holds the credential, the resolved principal, the repositories last
//! listed and the status of the current run. It is owned by whoever drives the
//! pipeline and mutated only through the methods below; observers either take a
//! [`SessionSnapshot`] or register a [`ProgressCallback`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DocgenError, Result};
use crate::model::{Principal, RepositorySummary};

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Blank tokens are treated as absent.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        (!token.is_empty()).then_some(Credential(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Cooperative cancellation shared between the driver and whoever wants to stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Checked before every network call.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DocgenError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress events emitted while a generation run is in flight.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GenerationProgress {
    Authenticated {
        login: String,
    },
    ListingComplete {
        total: usize,
    },
    RepositoryStarted {
        name: String,
        index: usize,
        total: usize,
    },
    RepositoryDocumented {
        name: String,
        files: usize,
        progress: f64,
    },
    RepositoryFailed {
        name: String,
        error: String,
    },
    Persisted {
        destination: String,
    },
    PersistFailed {
        destination: String,
        error: String,
    },
    Finished {
        documented: usize,
        total: usize,
    },
}

/// Callback for progress updates during a generation run.
pub type ProgressCallback = Box<dyn Fn(GenerationProgress) + Send + Sync>;

#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: GenerationProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatus {
    pub busy: bool,
    pub completed: bool,
    /// Fraction of listed repositories documented so far, in `0.0..=1.0`.
    pub progress: f64,
    pub task: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub principal: Option<Principal>,
    pub repositories: Vec<RepositorySummary>,
    pub status: RunStatus,
}

#[derive(Default)]
pub struct Session {
    credential: Option<Credential>,
    principal: Option<Principal>,
    repositories: Vec<RepositorySummary>,
    status: RunStatus,
    cancel: CancelFlag,
    on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credential", &self.credential)
            .field("principal", &self.principal.as_ref().map(|p| &p.login))
            .field("repositories", &self.repositories.len())
            .field("status", &self.status)
            .finish()
    }
}

impl Session {
    pub fn new(credential: Option<Credential>) -> Self {
        Session {
            credential,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replacing the credential invalidates everything derived from the old one.
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
        self.principal = None;
        self.repositories.clear();
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn repositories(&self) -> &[RepositorySummary] {
        &self.repositories
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.is_authenticated(),
            principal: self.principal.clone(),
            repositories: self.repositories.clone(),
            status: self.status.clone(),
        }
    }

    pub(crate) fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    pub(crate) fn set_repositories(&mut self, repositories: Vec<RepositorySummary>) {
        self.repositories = repositories;
    }

    pub(crate) fn begin_run(&mut self) {
        self.status = RunStatus {
            busy: true,
            completed: false,
            progress: 0.0,
            task: "Starting".to_string(),
        };
    }

    pub(crate) fn set_task(&mut self, task: impl Into<String>) {
        self.status.task = task.into();
    }

    pub(crate) fn set_progress(&mut self, progress: f64) {
        self.status.progress = progress.clamp(0.0, 1.0);
    }

    pub(crate) fn end_run(&mut self, completed: bool, task: impl Into<String>) {
        self.status.busy = false;
        self.status.completed = completed;
        self.status.task = task.into();
    }

    pub(crate) fn emit(&self, event: GenerationProgress) {
        emit(self.on_progress.as_ref(), event);
    }
}

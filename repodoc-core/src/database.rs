//! # Generation driver
//!
//! [`Generator`] runs the whole pipeline for one [`Session`]: resolve the user, list
//! their repositories, assemble each one in listing order, then serialise the
//! combined database and hand it to every configured [`DatabaseSink`].
//!
//! Only three things end a run early: a missing or rejected credential, a failed
//! listing, and cancellation. A repository that cannot be documented is logged,
//! recorded in the [`RunReport`] and skipped. A sink that cannot be written is
//! handled the same way, and the other sinks are still written.

use tracing::{error, info, warn};

use crate::assemble::DocumentationAssembler;
use crate::config::Limits;
use crate::contract::{DatabaseSink, GitHubApi};
use crate::error::{DocgenError, Result};
use crate::identity::fetch_current_user;
use crate::listing::list_all_repositories;
use crate::model::{DocumentationDatabase, RepositorySummary};
use crate::pacing::{Pacing, PacingUnit};
use crate::persist::serialize_database;
use crate::session::{GenerationProgress, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryResult {
    Documented { files: usize, skipped_files: Vec<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOutcome {
    pub id: u64,
    pub full_name: String,
    pub result: RepositoryResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutcome {
    pub destination: String,
    /// `None` when the write succeeded.
    pub error: Option<String>,
}

/// What happened to each repository and each output during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub repositories: Vec<RepositoryOutcome>,
    pub sinks: Vec<SinkOutcome>,
}

impl RunReport {
    pub fn documented(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.result, RepositoryResult::Documented { .. }))
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RepositoryOutcome> {
        self.repositories
            .iter()
            .filter(|r| matches!(r.result, RepositoryResult::Failed { .. }))
    }

    /// True if at least one sink received the database.
    pub fn persisted(&self) -> bool {
        self.sinks.iter().any(|s| s.error.is_none())
    }
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub database: DocumentationDatabase,
    pub report: RunReport,
}

pub struct Generator<'a, A: ?Sized> {
    api: &'a A,
    pacing: &'a dyn Pacing,
    limits: Limits,
    sinks: Vec<Box<dyn DatabaseSink + 'a>>,
}

impl<'a, A> Generator<'a, A>
where
    A: GitHubApi + ?Sized,
{
    pub fn new(api: &'a A, pacing: &'a dyn Pacing, limits: Limits) -> Self {
        Generator {
            api,
            pacing,
            limits: limits.clamped(),
            sinks: Vec::new(),
        }
    }

    /// Sinks are written in the order they were added.
    pub fn with_sink(mut self, sink: impl DatabaseSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_sinks<I, S>(mut self, sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: DatabaseSink + 'a,
    {
        for sink in sinks {
            self.sinks.push(Box::new(sink));
        }
        self
    }

    /// Resolve the user and list their repositories, storing both on the session.
    pub async fn refresh_repositories(
        &self,
        session: &mut Session,
    ) -> Result<Vec<RepositorySummary>> {
        fetch_current_user(self.api, session).await?;
        let cancel = session.cancel_flag().clone();
        let repositories =
            list_all_repositories(self.api, self.pacing, &self.limits, &cancel).await?;
        session.set_repositories(repositories.clone());
        session.emit(GenerationProgress::ListingComplete {
            total: repositories.len(),
        });
        Ok(repositories)
    }

    pub async fn generate_combined_documentation(
        &self,
        session: &mut Session,
    ) -> Result<GenerationOutcome> {
        if session.credential().is_none() {
            warn!("No access token configured, nothing to generate");
            return Err(DocgenError::MissingCredential);
        }

        session.begin_run();
        let result = self.run(session).await;
        match &result {
            Ok(outcome) => {
                session.set_progress(1.0);
                session.end_run(
                    true,
                    format!(
                        "Documented {} of {} repositories",
                        outcome.report.documented(),
                        outcome.report.repositories.len()
                    ),
                );
            }
            Err(DocgenError::Cancelled) => session.end_run(false, "Cancelled"),
            Err(e) => session.end_run(false, format!("Failed: {e}")),
        }
        result
    }

    async fn run(&self, session: &mut Session) -> Result<GenerationOutcome> {
        session.set_task("Resolving user");
        let repositories = self.refresh_repositories(session).await?;
        let user = session
            .principal()
            .map(|p| p.login.clone())
            .ok_or(DocgenError::AuthenticationFailed { status: None })?;

        let cancel = session.cancel_flag().clone();
        let assembler =
            DocumentationAssembler::new(self.api, self.pacing, self.limits, cancel.clone());
        let total = repositories.len();
        let mut records = Vec::with_capacity(total);
        let mut report = RunReport::default();

        for (index, repo) in repositories.iter().enumerate() {
            if index > 0 {
                self.pacing.pause(PacingUnit::Repository).await;
            }
            cancel.check()?;

            session.set_task(format!("Documenting {} ({}/{})", repo.full_name, index + 1, total));
            session.emit(GenerationProgress::RepositoryStarted {
                name: repo.full_name.clone(),
                index,
                total,
            });

            let result = match assembler.assemble(repo).await {
                Ok(assembled) => {
                    let files = assembled.record.code_files.len();
                    records.push(assembled.record);
                    let progress = records.len() as f64 / total as f64;
                    session.set_progress(progress);
                    session.emit(GenerationProgress::RepositoryDocumented {
                        name: repo.full_name.clone(),
                        files,
                        progress,
                    });
                    RepositoryResult::Documented {
                        files,
                        skipped_files: assembled.skipped.into_iter().map(|s| s.path).collect(),
                    }
                }
                Err(DocgenError::Cancelled) => return Err(DocgenError::Cancelled),
                Err(e) => {
                    error!(repo = %repo.full_name, error = %e, "Failed to document repository");
                    session.emit(GenerationProgress::RepositoryFailed {
                        name: repo.full_name.clone(),
                        error: e.to_string(),
                    });
                    RepositoryResult::Failed { error: e.to_string() }
                }
            };
            report.repositories.push(RepositoryOutcome {
                id: repo.id,
                full_name: repo.full_name.clone(),
                result,
            });
        }

        cancel.check()?;
        let database = DocumentationDatabase::new(user, records);
        info!(
            user = %database.user,
            documented = database.repository_count,
            listed = total,
            "Built documentation database"
        );

        session.set_task("Saving");
        let bytes = serialize_database(&database)?;
        for sink in &self.sinks {
            report.sinks.push(self.write_sink(session, sink.as_ref(), &bytes));
        }

        session.emit(GenerationProgress::Finished {
            documented: database.repository_count,
            total,
        });
        Ok(GenerationOutcome { database, report })
    }

    fn write_sink(&self, session: &Session, sink: &dyn DatabaseSink, bytes: &[u8]) -> SinkOutcome {
        let destination = sink.describe();
        match sink.write(bytes) {
            Ok(()) => {
                session.emit(GenerationProgress::Persisted {
                    destination: destination.clone(),
                });
                SinkOutcome {
                    destination,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    destination = %destination,
                    error = %e,
                    "Failed to persist documentation database"
                );
                session.emit(GenerationProgress::PersistFailed {
                    destination: destination.clone(),
                    error: e.to_string(),
                });
                SinkOutcome {
                    destination,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockDatabaseSink;
    use crate::pacing::NoPacing;
    use crate::persist::parse_database;
    use crate::session::{CancelFlag, Credential};
    use crate::testing::{CountingPacing, FakeGitHub, FakeRequest};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn session() -> Session {
        Session::new(Credential::new("ghp_test"))
    }

    fn capturing_sink(name: &str, captured: Arc<Mutex<Vec<u8>>>) -> MockDatabaseSink {
        let mut sink = MockDatabaseSink::new();
        sink.expect_describe().return_const(name.to_string());
        sink.expect_write().times(1).returning(move |bytes| {
            captured.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        });
        sink
    }

    fn silent_sink() -> MockDatabaseSink {
        let mut sink = MockDatabaseSink::new();
        sink.expect_describe().return_const("unused".to_string());
        sink.expect_write().never();
        sink
    }

    fn three_repositories() -> FakeGitHub {
        FakeGitHub::new("octo")
            .with_repositories(3)
            .with_file("octo/repo-1", "main.rs", "fn main() {}")
            .with_file("octo/repo-2", "lib.py", "x = 1")
            .with_file("octo/repo-3", "README.md", "# three")
    }

    #[tokio::test]
    async fn missing_credential_issues_no_requests() {
        let api = three_repositories();
        let generator = Generator::new(&api, &NoPacing, Limits::default()).with_sink(silent_sink());
        let mut session = Session::new(None);

        let err = generator.generate_combined_documentation(&mut session).await.unwrap_err();

        assert!(matches!(err, DocgenError::MissingCredential));
        assert!(api.requests().is_empty());
        assert!(!session.status().busy);
    }

    #[tokio::test]
    async fn rejected_credential_never_lists_repositories() {
        let api = three_repositories().rejecting_credential();
        let generator = Generator::new(&api, &NoPacing, Limits::default()).with_sink(silent_sink());
        let mut session = session();

        let err = generator.generate_combined_documentation(&mut session).await.unwrap_err();

        assert!(matches!(err, DocgenError::AuthenticationFailed { .. }));
        assert_eq!(api.page_requests(), 0);
        assert!(!session.is_authenticated());
        assert!(!session.status().completed);
    }

    #[tokio::test]
    async fn documents_every_repository_and_persists() {
        let api = three_repositories();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let generator = Generator::new(&api, &NoPacing, Limits::default())
            .with_sink(capturing_sink("primary", Arc::clone(&captured)));
        let mut session = session();

        let outcome = generator.generate_combined_documentation(&mut session).await.unwrap();

        assert_eq!(outcome.database.user, "octo");
        assert_eq!(outcome.database.repository_count, 3);
        assert_eq!(outcome.report.documented(), 3);
        assert_eq!(outcome.database.repositories[2].readme.as_deref(), Some("# three"));

        let persisted = parse_database(&captured.lock().unwrap()).unwrap();
        assert_eq!(persisted.repository_count, 3);

        let status = session.status();
        assert!(status.completed);
        assert!(!status.busy);
        assert_eq!(status.progress, 1.0);
        assert_eq!(session.repositories().len(), 3);
    }

    #[tokio::test]
    async fn one_failing_repository_is_skipped() {
        let api = three_repositories().failing_path("octo/repo-2", "");
        let generator = Generator::new(&api, &NoPacing, Limits::default());
        let mut session = session();

        let outcome = generator.generate_combined_documentation(&mut session).await.unwrap();

        let names: Vec<_> = outcome.database.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["repo-1", "repo-3"]);
        assert_eq!(outcome.database.repository_count, 2);
        let failed: Vec<_> = outcome.report.failed().map(|r| r.full_name.as_str()).collect();
        assert_eq!(failed, vec!["octo/repo-2"]);
    }

    #[tokio::test]
    async fn failing_sink_does_not_stop_the_next_one() {
        let api = three_repositories();
        let mut broken = MockDatabaseSink::new();
        broken.expect_describe().return_const("broken".to_string());
        broken.expect_write().times(1).returning(|_| {
            Err(DocgenError::Persist {
                path: PathBuf::from("/nowhere/db.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        let captured = Arc::new(Mutex::new(Vec::new()));
        let generator = Generator::new(&api, &NoPacing, Limits::default())
            .with_sink(broken)
            .with_sink(capturing_sink("project", Arc::clone(&captured)));
        let mut session = session();

        let outcome = generator.generate_combined_documentation(&mut session).await.unwrap();

        assert_eq!(outcome.report.sinks.len(), 2);
        assert!(outcome.report.sinks[0].error.is_some());
        assert_eq!(outcome.report.sinks[1].error, None);
        assert!(outcome.report.persisted());
        assert!(!captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_persists_nothing() {
        let api = three_repositories();
        let cancel = CancelFlag::new();
        let trip = cancel.clone();
        let mut session = session()
            .with_cancel_flag(cancel)
            .with_progress(Box::new(move |event: GenerationProgress| {
                if let GenerationProgress::RepositoryDocumented { .. } = event {
                    trip.cancel();
                }
            }));
        let generator = Generator::new(&api, &NoPacing, Limits::default()).with_sink(silent_sink());

        let err = generator.generate_combined_documentation(&mut session).await.unwrap_err();

        assert!(matches!(err, DocgenError::Cancelled));
        assert_eq!(session.status().task, "Cancelled");
        let touched_second = api
            .requests()
            .iter()
            .any(|r| matches!(r, FakeRequest::Contents { repo, .. } if repo == "octo/repo-2"));
        assert!(!touched_second);
    }

    #[tokio::test]
    async fn pauses_between_repositories_only() {
        let api = three_repositories();
        let pacing = CountingPacing::default();
        let generator = Generator::new(&api, &pacing, Limits::default());

        generator.generate_combined_documentation(&mut session()).await.unwrap();

        assert_eq!(pacing.count(PacingUnit::Repository), 2);
        assert_eq!(pacing.count(PacingUnit::Page), 0);
    }

    #[tokio::test]
    async fn progress_events_follow_the_run() {
        let api = three_repositories().failing_path("octo/repo-3", "");
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        let mut session = session().with_progress(Box::new(move |event: GenerationProgress| {
            seen.lock().unwrap().push(event)
        }));
        let generator = Generator::new(&api, &NoPacing, Limits::default());

        generator.generate_combined_documentation(&mut session).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], GenerationProgress::Authenticated { login: "octo".into() });
        assert_eq!(events[1], GenerationProgress::ListingComplete { total: 3 });
        assert!(events.iter().any(|e| matches!(
            e,
            GenerationProgress::RepositoryFailed { name, .. } if name == "octo/repo-3"
        )));
        assert_eq!(
            events.last(),
            Some(&GenerationProgress::Finished { documented: 2, total: 3 })
        );
    }
}

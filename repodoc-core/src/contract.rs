//! # contract: the seams the pipeline is written against
//!
//! Every stage of the pipeline talks to the remote API through [`GitHubApi`] and
//! hands its final bytes to one or more [`DatabaseSink`]s. Production code plugs in
//! [`crate::client::GitHubClient`] and [`crate::persist::FileSink`]; tests plug in the
//! `mockall` generated mocks or a hand-written fake.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`. The mocks are exported under the
//!   `test-export-mocks` feature so the CLI crate and integration tests can use them.

use async_trait::async_trait;
use mockall::automock;

use crate::error::Result;
use crate::model::{ContentEntry, Principal, RepositorySummary};

/// Read-only access to the subset of the GitHub REST API the pipeline consumes.
///
/// Implementors must not retry internally; callers decide what a failure means.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `GET /user`: the principal the credential belongs to.
    async fn current_user(&self) -> Result<Principal>;

    /// One page of `GET /user/repos` (owner affiliation only). Pages are 1-based.
    async fn repositories_page(&self, page: u32, per_page: u32) -> Result<Vec<RepositorySummary>>;

    /// `GET /repos/{owner}/{repo}/contents/{path}`. A single-file lookup comes back as
    /// a one-element list so both shapes share one return type. `path` is unencoded.
    async fn contents(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<ContentEntry>>;
}

/// A destination for the serialised documentation database.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait DatabaseSink: Send + Sync {
    /// Human-readable location, used in logs and the run report.
    fn describe(&self) -> String;

    /// Replace whatever the destination holds with `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<()>;
}

//! Per-repository documentation: README, tree and source files in one record.

use tracing::{debug, info};

use crate::config::Limits;
use crate::contents::fetch_file_content;
use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::extract::{extract_code_files, SkippedFile};
use crate::model::{RepositoryDocumentationRecord, RepositorySummary};
use crate::pacing::Pacing;
use crate::session::CancelFlag;
use crate::tree::TreeBuilder;

const README_PATH: &str = "README.md";

/// A record together with the source files that had to be left out of it.
#[derive(Debug)]
pub struct AssembledRepository {
    pub record: RepositoryDocumentationRecord,
    pub skipped: Vec<SkippedFile>,
}

pub struct DocumentationAssembler<'a, A: ?Sized> {
    api: &'a A,
    pacing: &'a dyn Pacing,
    limits: Limits,
    cancel: CancelFlag,
}

impl<'a, A> DocumentationAssembler<'a, A>
where
    A: GitHubApi + ?Sized,
{
    pub fn new(api: &'a A, pacing: &'a dyn Pacing, limits: Limits, cancel: CancelFlag) -> Self {
        DocumentationAssembler {
            api,
            pacing,
            limits: limits.clamped(),
            cancel,
        }
    }

    pub async fn generate_documentation(
        &self,
        repo: &RepositorySummary,
    ) -> Result<RepositoryDocumentationRecord> {
        self.assemble(repo).await.map(|assembled| assembled.record)
    }

    /// The README is optional. The tree is not: if the root cannot be listed the
    /// repository fails as a whole.
    pub async fn assemble(&self, repo: &RepositorySummary) -> Result<AssembledRepository> {
        let owner = repo.owner.login.as_str();
        let name = repo.name.as_str();

        let readme = self.readme(owner, name).await?;

        let tree = TreeBuilder::new(self.api, self.pacing, self.limits, self.cancel.clone())
            .build_tree(owner, name, "", 0)
            .await?;

        let extraction = extract_code_files(
            self.api,
            &self.cancel,
            self.limits.max_files_per_repo,
            owner,
            name,
            &tree,
        )
        .await?;

        info!(
            repo = %repo.full_name,
            has_readme = readme.is_some(),
            top_level_entries = tree.len(),
            files = extraction.files.len(),
            skipped = extraction.skipped.len(),
            "Assembled repository documentation"
        );

        Ok(AssembledRepository {
            record: RepositoryDocumentationRecord::new(repo, readme, tree, extraction.files),
            skipped: extraction.skipped,
        })
    }

    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        self.cancel.check()?;
        match fetch_file_content(self.api, owner, repo, README_PATH).await {
            Ok(text) => Ok(Some(text)),
            Err(DocgenError::Cancelled) => Err(DocgenError::Cancelled),
            Err(e) => {
                debug!(owner, repo, error = %e, "No readable README");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::NoPacing;
    use crate::testing::FakeGitHub;

    fn assembler(api: &FakeGitHub) -> DocumentationAssembler<'_, FakeGitHub> {
        DocumentationAssembler::new(api, &NoPacing, Limits::default(), CancelFlag::new())
    }

    #[tokio::test]
    async fn builds_a_complete_record() {
        let api = FakeGitHub::new("octo")
            .with_repository("demo")
            .with_file("octo/demo", "README.md", "# Demo\n")
            .with_file("octo/demo", "src/lib.rs", "pub fn f() {}")
            .with_file("octo/demo", "notes.txt", "todo");
        let repo = crate::testing::repository(1, "octo", "demo");

        let record = assembler(&api).generate_documentation(&repo).await.unwrap();

        assert_eq!(record.full_name, "octo/demo");
        assert_eq!(record.readme.as_deref(), Some("# Demo\n"));
        assert_eq!(record.file_tree.len(), 3);
        assert_eq!(record.code_files.len(), 1);
        assert_eq!(record.code_files[0].path, "src/lib.rs");
        assert_eq!(record.owner, "octo");
    }

    #[tokio::test]
    async fn missing_readme_is_not_an_error() {
        let api = FakeGitHub::new("octo")
            .with_repository("demo")
            .with_file("octo/demo", "main.go", "package main");
        let repo = crate::testing::repository(1, "octo", "demo");

        let record = assembler(&api).generate_documentation(&repo).await.unwrap();

        assert!(record.readme.is_none());
        assert_eq!(record.code_files.len(), 1);
    }

    #[tokio::test]
    async fn unlistable_root_fails_the_repository() {
        let api = FakeGitHub::new("octo")
            .with_repository("demo")
            .failing_path("octo/demo", "");
        let repo = crate::testing::repository(1, "octo", "demo");

        let err = assembler(&api).generate_documentation(&repo).await.unwrap_err();
        assert!(matches!(err, DocgenError::NetworkFailure { .. }));
    }

    #[tokio::test]
    async fn skipped_files_are_reported() {
        let api = FakeGitHub::new("octo")
            .with_repository("demo")
            .with_file("octo/demo", "a.rs", "a")
            .with_file("octo/demo", "b.rs", "b")
            .failing_path("octo/demo", "a.rs");
        let repo = crate::testing::repository(1, "octo", "demo");

        let assembled = assembler(&api).assemble(&repo).await.unwrap();

        assert_eq!(assembled.record.code_files.len(), 1);
        assert_eq!(assembled.skipped.len(), 1);
        assert_eq!(assembled.skipped[0].path, "a.rs");
    }
}

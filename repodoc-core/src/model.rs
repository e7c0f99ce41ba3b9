//! Data model shared by every stage of the pipeline.
//!
//! Inbound types (`Principal`, `RepositorySummary`, `ContentEntry`) mirror the
//! GitHub REST payloads and use its snake_case field names. Outbound types (the
//! documentation record and database) are what gets persisted and use camelCase
//! keys, with absent optionals omitted.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Schema version written into every generated database.
pub const DATABASE_VERSION: &str = "1.0";

/// The authenticated user, as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub public_repos: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// One repository owned by the user. Equality and hashing look at `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub topics: Vec<String>,
    pub owner: RepositoryOwner,
    pub html_url: Option<String>,
    pub default_branch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PartialEq for RepositorySummary {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RepositorySummary {}

impl Hash for RepositorySummary {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Kind of a repository content entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a `GET /repos/{owner}/{repo}/contents/{path}` response.
///
/// `content` is only populated for single-file lookups, base64 encoded with
/// embedded line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub sha: Option<String>,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// `None` for files and for directories below the recursion cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileTreeNode>>,
}

impl FileTreeNode {
    pub fn leaf(entry: &ContentEntry) -> Self {
        FileTreeNode {
            name: entry.name.clone(),
            path: entry.path.clone(),
            kind: entry.kind,
            size: entry.size,
            children: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Number of levels in this subtree, counting the node itself.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .as_deref()
            .map(tree_depth)
            .unwrap_or(0)
    }
}

/// Deepest level present in a forest of nodes (0 for an empty forest).
pub fn tree_depth(nodes: &[FileTreeNode]) -> usize {
    nodes.iter().map(FileTreeNode::depth).max().unwrap_or(0)
}

/// Decoded text of one recognised source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub name: String,
    pub language: String,
    pub content: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDocumentationRecord {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub stars: u32,
    pub forks: u32,
    pub topics: Vec<String>,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    pub file_tree: Vec<FileTreeNode>,
    pub code_files: Vec<SourceFile>,
}

impl RepositoryDocumentationRecord {
    pub fn new(
        repo: &RepositorySummary,
        readme: Option<String>,
        file_tree: Vec<FileTreeNode>,
        code_files: Vec<SourceFile>,
    ) -> Self {
        RepositoryDocumentationRecord {
            id: repo.id,
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            description: repo.description.clone(),
            language: repo.language.clone(),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            topics: repo.topics.clone(),
            owner: repo.owner.login.clone(),
            html_url: repo.html_url.clone(),
            default_branch: repo.default_branch.clone(),
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            readme,
            file_tree,
            code_files,
        }
    }
}

/// The persisted artifact covering every documented repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationDatabase {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub user: String,
    pub repository_count: usize,
    pub repositories: Vec<RepositoryDocumentationRecord>,
}

impl DocumentationDatabase {
    /// `repository_count` is always derived from `repositories`.
    pub fn new(user: impl Into<String>, repositories: Vec<RepositoryDocumentationRecord>) -> Self {
        Self::generated_at(user, repositories, Utc::now())
    }

    pub fn generated_at(
        user: impl Into<String>,
        repositories: Vec<RepositoryDocumentationRecord>,
        at: DateTime<Utc>,
    ) -> Self {
        DocumentationDatabase {
            version: DATABASE_VERSION.to_string(),
            generated_at: at.trunc_subsecs(0),
            user: user.into(),
            repository_count: repositories.len(),
            repositories,
        }
    }
}

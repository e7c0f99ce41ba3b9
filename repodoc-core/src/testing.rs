//! In-memory GitHub backend for tests.
//!
//! `mockall` expectations get unwieldy once a test needs a realistic repository
//! layout, so [`FakeGitHub`] keeps a small virtual filesystem per repository and
//! records every request it answers.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::{ContentEntry, EntryKind, Principal, RepositoryOwner, RepositorySummary};
use crate::pacing::{Pacing, PacingUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeRequest {
    CurrentUser,
    RepositoriesPage { page: u32, per_page: u32 },
    Contents { repo: String, path: String },
}

#[derive(Debug, Default)]
pub struct FakeGitHub {
    login: String,
    reject_credential: bool,
    repositories: Vec<RepositorySummary>,
    /// Keyed by (`owner/repo`, path).
    listings: HashMap<(String, String), Vec<ContentEntry>>,
    failing: HashSet<(String, String)>,
    failing_pages: HashSet<u32>,
    requests: Mutex<Vec<FakeRequest>>,
}

pub fn repository(id: u64, owner: &str, name: &str) -> RepositorySummary {
    RepositorySummary {
        id,
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        description: Some(format!("The {name} repository")),
        language: Some("Rust".to_string()),
        stargazers_count: 0,
        forks_count: 0,
        topics: Vec::new(),
        owner: RepositoryOwner {
            login: owner.to_string(),
        },
        html_url: Some(format!("https://github.com/{owner}/{name}")),
        default_branch: Some("main".to_string()),
        created_at: None,
        updated_at: None,
    }
}

impl FakeGitHub {
    pub fn new(login: &str) -> Self {
        FakeGitHub {
            login: login.to_string(),
            ..Self::default()
        }
    }

    /// Every `current_user` call answers 401.
    pub fn rejecting_credential(mut self) -> Self {
        self.reject_credential = true;
        self
    }

    pub fn with_repository(mut self, name: &str) -> Self {
        let id = self.repositories.len() as u64 + 1;
        let repo = repository(id, &self.login, name);
        self.listings
            .entry((repo.full_name.clone(), String::new()))
            .or_default();
        self.repositories.push(repo);
        self
    }

    /// Adds `count` repositories named `repo-1` … `repo-N`.
    pub fn with_repositories(mut self, count: usize) -> Self {
        for i in 1..=count {
            self = self.with_repository(&format!("repo-{i}"));
        }
        self
    }

    /// Adds a file, creating every parent directory on the way.
    pub fn with_file(mut self, full_name: &str, path: &str, text: &str) -> Self {
        let mut parent = String::new();
        let (dirs, file_name): (Vec<&str>, &str) = match path.rsplit_once('/') {
            Some((dirs, file_name)) => (dirs.split('/').collect(), file_name),
            None => (Vec::new(), path),
        };

        for dir in dirs {
            let dir_path = join(&parent, dir);
            self.push_entry(full_name, &parent, entry(dir, &dir_path, EntryKind::Dir, None, None));
            self.listings
                .entry((full_name.to_string(), dir_path.clone()))
                .or_default();
            parent = dir_path;
        }

        let file_path = join(&parent, file_name);
        let size = text.len() as u64;
        let listed = entry(file_name, &file_path, EntryKind::File, Some(size), None);
        self.push_entry(full_name, &parent, listed);
        self.listings.insert(
            (full_name.to_string(), file_path.clone()),
            vec![entry(
                file_name,
                &file_path,
                EntryKind::File,
                Some(size),
                Some(wrap_base64(&STANDARD.encode(text))),
            )],
        );
        self
    }

    pub fn failing_path(mut self, full_name: &str, path: &str) -> Self {
        self.failing.insert((full_name.to_string(), path.to_string()));
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn requests(&self) -> Vec<FakeRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Paths of every contents lookup, in request order.
    pub fn content_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                FakeRequest::Contents { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn page_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, FakeRequest::RepositoriesPage { .. }))
            .count()
    }

    fn push_entry(&mut self, full_name: &str, parent: &str, new_entry: ContentEntry) {
        let listing = self
            .listings
            .entry((full_name.to_string(), parent.to_string()))
            .or_default();
        if !listing.iter().any(|e| e.path == new_entry.path) {
            listing.push(new_entry);
        }
    }

    fn record(&self, request: FakeRequest) {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn entry(
    name: &str,
    path: &str,
    kind: EntryKind,
    size: Option<u64>,
    content: Option<String>,
) -> ContentEntry {
    ContentEntry {
        name: name.to_string(),
        path: path.to_string(),
        kind,
        size,
        sha: None,
        encoding: content.as_ref().map(|_| "base64".to_string()),
        content,
    }
}

/// Mimic the 60-column line wrapping GitHub applies to inline content.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
        .collect()
}

fn not_found(url: String) -> DocgenError {
    DocgenError::NetworkFailure {
        url,
        status: Some(404),
        reason: "Not Found".to_string(),
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn current_user(&self) -> Result<Principal> {
        self.record(FakeRequest::CurrentUser);
        if self.reject_credential {
            return Err(DocgenError::AuthenticationFailed { status: Some(401) });
        }
        Ok(Principal {
            login: self.login.clone(),
            id: 1,
            name: None,
            email: None,
            avatar_url: None,
            html_url: None,
            public_repos: Some(self.repositories.len() as u32),
        })
    }

    async fn repositories_page(&self, page: u32, per_page: u32) -> Result<Vec<RepositorySummary>> {
        self.record(FakeRequest::RepositoriesPage { page, per_page });
        if self.failing_pages.contains(&page) {
            return Err(DocgenError::NetworkFailure {
                url: format!("/user/repos?page={page}"),
                status: Some(502),
                reason: "Bad Gateway".to_string(),
            });
        }
        let start = (page.saturating_sub(1) * per_page) as usize;
        Ok(self
            .repositories
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn contents(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<ContentEntry>> {
        let full_name = format!("{owner}/{repo}");
        self.record(FakeRequest::Contents {
            repo: full_name.clone(),
            path: path.to_string(),
        });
        let key = (full_name, path.to_string());
        if self.failing.contains(&key) {
            return Err(DocgenError::NetworkFailure {
                url: format!("/repos/{}/contents/{}", key.0, key.1),
                status: Some(500),
                reason: "Internal Server Error".to_string(),
            });
        }
        self.listings
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(format!("/repos/{}/contents/{}", key.0, key.1)))
    }
}

/// Pacing that never sleeps and remembers every pause it was asked for.
#[derive(Debug, Default)]
pub struct CountingPacing {
    pauses: Mutex<Vec<PacingUnit>>,
}

impl CountingPacing {
    pub fn count(&self, unit: PacingUnit) -> usize {
        self.pauses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|u| **u == unit)
            .count()
    }

    pub fn total(&self) -> usize {
        self.pauses.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Pacing for CountingPacing {
    async fn pause(&self, unit: PacingUnit) {
        self.pauses.lock().unwrap_or_else(PoisonError::into_inner).push(unit);
    }
}

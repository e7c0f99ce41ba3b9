//! Source file extraction from a built tree.

use tracing::{debug, warn};

use crate::contents::fetch_file_content;
use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::{EntryKind, FileTreeNode, SourceFile};
use crate::session::CancelFlag;

/// Extensions treated as source code, with the language label recorded for each.
const LANGUAGES: &[(&str, &str)] = &[
    ("swift", "Swift"),
    ("m", "Objective-C"),
    ("mm", "Objective-C++"),
    ("h", "C Header"),
    ("c", "C"),
    ("cpp", "C++"),
    ("hpp", "C++ Header"),
    ("py", "Python"),
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("go", "Go"),
    ("rs", "Rust"),
];

/// Language label for a file name, or `None` if its extension is not recognised.
pub fn language_for(file_name: &str) -> Option<&'static str> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    LANGUAGES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, language)| *language)
}

/// A file that was selected for extraction but could not be read.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: String,
    pub error: DocgenError,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Depth-first walk collecting recognised source files, in the order they would be
/// visited. Every directory is walked; the per-repository cap is applied later.
fn candidates<'t>(nodes: &'t [FileTreeNode], out: &mut Vec<(&'t FileTreeNode, &'static str)>) {
    for node in nodes {
        match node.kind {
            EntryKind::File => {
                if let Some(language) = language_for(&node.name) {
                    out.push((node, language));
                }
            }
            EntryKind::Dir => candidates(node.children.as_deref().unwrap_or_default(), out),
            _ => {}
        }
    }
}

/// Fetch and decode the recognised source files in `tree`, at most `max_files`.
///
/// A file that cannot be fetched or decoded is logged and skipped. Only
/// cancellation aborts the walk.
pub async fn extract_code_files<A>(
    api: &A,
    cancel: &CancelFlag,
    max_files: usize,
    owner: &str,
    repo: &str,
    tree: &[FileTreeNode],
) -> Result<Extraction>
where
    A: GitHubApi + ?Sized,
{
    let mut found = Vec::new();
    candidates(tree, &mut found);

    let mut extraction = Extraction::default();
    for (node, language) in found {
        if extraction.files.len() >= max_files {
            debug!(owner, repo, path = %node.path, max_files, "File cap reached, not fetching");
            continue;
        }
        cancel.check()?;

        match fetch_file_content(api, owner, repo, &node.path).await {
            Ok(content) => {
                let size = node.size.unwrap_or(content.len() as u64);
                extraction.files.push(SourceFile {
                    path: node.path.clone(),
                    name: node.name.clone(),
                    language: language.to_string(),
                    content,
                    size,
                });
            }
            Err(DocgenError::Cancelled) => return Err(DocgenError::Cancelled),
            Err(error) => {
                warn!(
                    owner,
                    repo,
                    path = %node.path,
                    error = %error,
                    "Skipping unreadable source file"
                );
                extraction.skipped.push(SkippedFile {
                    path: node.path.clone(),
                    error,
                });
            }
        }
    }

    debug!(
        owner,
        repo,
        files = extraction.files.len(),
        skipped = extraction.skipped.len(),
        "Extracted source files"
    );
    Ok(extraction)
}

//! Repository content lookups: directory listings and single-file retrieval.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::{ContentEntry, EntryKind};

/// Characters left untouched in a URL path: unreserved, sub-delims, `:`, `@` and `/`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/');

/// Percent-encode a repository path for embedding in a URL. Slashes are kept.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_SAFE).to_string()
}

/// List the entries at `path` (empty for the repository root).
pub async fn list_contents<A>(
    api: &A,
    owner: &str,
    repo: &str,
    path: &str,
) -> Result<Vec<ContentEntry>>
where
    A: GitHubApi + ?Sized,
{
    let entries = api.contents(owner, repo, path).await?;
    debug!(owner, repo, path, entries = entries.len(), "Listed contents");
    Ok(entries)
}

/// Fetch a single file and return its text.
pub async fn fetch_file_content<A>(api: &A, owner: &str, repo: &str, path: &str) -> Result<String>
where
    A: GitHubApi + ?Sized,
{
    let entries = list_contents(api, owner, repo, path).await?;
    let encoded = entries
        .into_iter()
        .find(|e| e.kind == EntryKind::File)
        .and_then(|e| e.content)
        .ok_or_else(|| DocgenError::FileNotFound {
            path: format!("{owner}/{repo}/{path}"),
        })?;
    decode_base64_content(&encoded, path)
}

/// Decode the inline `content` of a file entry.
///
/// GitHub wraps the payload at 60 columns. Payloads that went through an extra
/// round of escaping carry the two characters `\n` instead, so both are removed.
pub fn decode_base64_content(encoded: &str, path: &str) -> Result<String> {
    let cleaned: String = encoded
        .replace("\\n", "")
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| DocgenError::decoding(format!("base64 content of {path}"), e))?;
    String::from_utf8(bytes).map_err(|e| DocgenError::decoding(format!("UTF-8 text of {path}"), e))
}

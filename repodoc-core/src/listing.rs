//! Paging through every repository the authenticated user owns.

use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::config::Limits;
use crate::contract::GitHubApi;
use crate::error::Result;
use crate::model::RepositorySummary;
use crate::pacing::{Pacing, PacingUnit};
use crate::session::CancelFlag;

/// Fetch pages 1, 2, … until one comes back empty or short.
///
/// The page size is clamped to what GitHub serves, so a short page is
/// necessarily the last and `n` repositories cost `n / page_size + 1` requests.
/// Any page failing fails the whole listing.
/// Repositories are deduplicated by id, keeping the first occurrence.
pub async fn list_all_repositories<A>(
    api: &A,
    pacing: &dyn Pacing,
    limits: &Limits,
    cancel: &CancelFlag,
) -> Result<Vec<RepositorySummary>>
where
    A: GitHubApi + ?Sized,
{
    let per_page = limits.clamped().page_size;
    let mut seen = HashSet::new();
    let mut repositories = Vec::new();
    let mut page = 1u32;

    loop {
        if page > 1 {
            pacing.pause(PacingUnit::Page).await;
        }
        cancel.check()?;

        let batch = api.repositories_page(page, per_page).await.map_err(|e| {
            error!(page, error = %e, "Repository listing failed");
            e
        })?;
        let fetched = batch.len();
        debug!(page, fetched, "Fetched repository page");

        for repo in batch {
            if seen.insert(repo.id) {
                repositories.push(repo);
            } else {
                debug!(id = repo.id, name = %repo.full_name, "Dropping duplicate repository");
            }
        }

        if fetched < per_page as usize {
            break;
        }
        page += 1;
    }

    info!(count = repositories.len(), pages = page, "Listed repositories");
    Ok(repositories)
}

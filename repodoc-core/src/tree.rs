//! Depth-bounded mirror of a repository's directory structure.

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::config::Limits;
use crate::contents::list_contents;
use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::{EntryKind, FileTreeNode};
use crate::pacing::{Pacing, PacingUnit};
use crate::session::CancelFlag;

pub struct TreeBuilder<'a, A: ?Sized> {
    api: &'a A,
    pacing: &'a dyn Pacing,
    limits: Limits,
    cancel: CancelFlag,
}

impl<'a, A> TreeBuilder<'a, A>
where
    A: GitHubApi + ?Sized,
{
    pub fn new(api: &'a A, pacing: &'a dyn Pacing, limits: Limits, cancel: CancelFlag) -> Self {
        TreeBuilder {
            api,
            pacing,
            limits: limits.clamped(),
            cancel,
        }
    }

    /// Build the tree below `path`, which sits at `depth` (0 for the root).
    ///
    /// Nothing is fetched at or past `max_depth`. Directories are only expanded
    /// while `depth < recurse_depth`; deeper ones come back as childless nodes.
    /// Failing to list `path` itself is an error, failing to list a subdirectory
    /// is not.
    pub fn build_tree<'s>(
        &'s self,
        owner: &'s str,
        repo: &'s str,
        path: &'s str,
        depth: usize,
    ) -> BoxFuture<'s, Result<Vec<FileTreeNode>>> {
        async move {
            if depth >= self.limits.max_depth {
                return Ok(Vec::new());
            }
            self.cancel.check()?;

            let entries = list_contents(self.api, owner, repo, path).await?;
            let mut nodes = Vec::with_capacity(entries.len());
            for entry in &entries {
                let mut node = FileTreeNode::leaf(entry);
                if entry.kind == EntryKind::Dir && depth < self.limits.recurse_depth {
                    let children = self.children_of(owner, repo, &entry.path, depth + 1).await?;
                    node.children = Some(children);
                }
                nodes.push(node);
                self.pacing.pause(PacingUnit::TreeEntry).await;
            }
            debug!(owner, repo, path, depth, nodes = nodes.len(), "Built tree level");
            Ok(nodes)
        }
        .boxed()
    }

    /// Subdirectory expansion is best-effort: any failure other than cancellation
    /// leaves the directory with an empty child list.
    async fn children_of(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        depth: usize,
    ) -> Result<Vec<FileTreeNode>> {
        match self.build_tree(owner, repo, path, depth).await {
            Ok(children) => Ok(children),
            Err(DocgenError::Cancelled) => Err(DocgenError::Cancelled),
            Err(e) => {
                warn!(
                    owner,
                    repo,
                    path,
                    error = %e,
                    "Could not list subdirectory, keeping it empty"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree_depth;
    use crate::pacing::NoPacing;
    use crate::testing::{CountingPacing, FakeGitHub};

    fn builder<'a>(api: &'a FakeGitHub, pacing: &'a dyn Pacing) -> TreeBuilder<'a, FakeGitHub> {
        TreeBuilder::new(api, pacing, Limits::default(), CancelFlag::new())
    }

    #[tokio::test]
    async fn preserves_listing_order_and_nests_children() {
        let api = FakeGitHub::new("octo")
            .with_file("octo/demo", "README.md", "# demo")
            .with_file("octo/demo", "src/main.rs", "fn main() {}")
            .with_file("octo/demo", "src/lib.rs", "")
            .with_file("octo/demo", "Cargo.toml", "[package]");

        let tree = builder(&api, &NoPacing).build_tree("octo", "demo", "", 0).await.unwrap();

        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src", "Cargo.toml"]);
        let src = &tree[1];
        assert!(src.is_dir());
        let children: Vec<_> = src
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|n| n.path.as_str())
            .collect();
        assert_eq!(children, vec!["src/main.rs", "src/lib.rs"]);
        assert!(tree[0].children.is_none());
    }

    #[tokio::test]
    async fn never_descends_past_the_depth_bounds() {
        let deep = (1..=10).map(|i| format!("d{i}")).collect::<Vec<_>>().join("/");
        let api = FakeGitHub::new("octo").with_file("octo/deep", &format!("{deep}/leaf.rs"), "x");

        let tree = builder(&api, &NoPacing).build_tree("octo", "deep", "", 0).await.unwrap();

        assert!(tree_depth(&tree) <= 5);
        // Root plus three levels of recursion; the directory at depth 3 is a leaf.
        assert_eq!(tree_depth(&tree), 4);
        let listed = api.content_requests();
        assert_eq!(listed, vec!["", "d1", "d1/d2", "d1/d2/d3"]);
    }

    #[tokio::test]
    async fn configured_depths_cannot_exceed_five_levels() {
        let deep = (1..=10).map(|i| format!("d{i}")).collect::<Vec<_>>().join("/");
        let api = FakeGitHub::new("octo").with_file("octo/deep", &format!("{deep}/leaf.rs"), "x");
        let limits = Limits {
            max_depth: 10,
            recurse_depth: 10,
            ..Limits::default()
        };

        let tree = TreeBuilder::new(&api, &NoPacing, limits, CancelFlag::new())
            .build_tree("octo", "deep", "", 0)
            .await
            .unwrap();

        assert_eq!(tree_depth(&tree), 5);
        assert_eq!(api.content_requests().len(), 5);
        assert!(!api.content_requests().iter().any(|p| p.contains("d6")));
    }

    #[tokio::test]
    async fn hard_ceiling_returns_nothing() {
        let api = FakeGitHub::new("octo").with_file("octo/demo", "a.rs", "");
        let tree = builder(&api, &NoPacing).build_tree("octo", "demo", "", 5).await.unwrap();
        assert!(tree.is_empty());
        assert!(api.content_requests().is_empty());
    }

    #[tokio::test]
    async fn failing_subdirectory_becomes_empty() {
        let api = FakeGitHub::new("octo")
            .with_file("octo/demo", "ok/a.rs", "")
            .with_file("octo/demo", "broken/b.rs", "")
            .failing_path("octo/demo", "broken");

        let tree = builder(&api, &NoPacing).build_tree("octo", "demo", "", 0).await.unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.as_ref().unwrap().len(), 1);
        assert_eq!(tree[1].children, Some(vec![]));
    }

    #[tokio::test]
    async fn failing_root_propagates() {
        let api = FakeGitHub::new("octo")
            .with_file("octo/demo", "a.rs", "")
            .failing_path("octo/demo", "");

        let err = builder(&api, &NoPacing).build_tree("octo", "demo", "", 0).await.unwrap_err();
        assert!(matches!(err, DocgenError::NetworkFailure { .. }));
    }

    #[tokio::test]
    async fn cancellation_is_not_swallowed() {
        let api = FakeGitHub::new("octo").with_file("octo/demo", "src/a.rs", "");
        let cancel = CancelFlag::new();
        cancel.cancel();
        let builder = TreeBuilder::new(&api, &NoPacing, Limits::default(), cancel);

        let err = builder.build_tree("octo", "demo", "", 0).await.unwrap_err();
        assert!(matches!(err, DocgenError::Cancelled));
        assert!(api.content_requests().is_empty());
    }

    #[tokio::test]
    async fn pauses_after_every_entry() {
        let api = FakeGitHub::new("octo")
            .with_file("octo/demo", "a.rs", "")
            .with_file("octo/demo", "src/b.rs", "")
            .with_file("octo/demo", "src/c.rs", "");
        let pacing = CountingPacing::default();

        builder(&api, &pacing).build_tree("octo", "demo", "", 0).await.unwrap();

        // a.rs, src, src/b.rs, src/c.rs
        assert_eq!(pacing.count(PacingUnit::TreeEntry), 4);
        assert_eq!(pacing.total(), 4);
    }
}

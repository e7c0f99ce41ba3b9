//! Generator settings: traversal limits, pacing delays and output locations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{DocgenError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DATABASE_FILE_NAME: &str = "repository_database.json";

/// GitHub serves at most this many repositories per listing page.
pub const MAX_PAGE_SIZE: u32 = 100;
/// No traversal reaches this many levels below a repository root.
pub const MAX_TREE_DEPTH: usize = 5;
pub const MAX_FILES_PER_REPO: usize = 50;

/// Traversal bounds applied to every repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Repositories requested per listing page.
    pub page_size: u32,
    /// Hard ceiling: `build_tree` returns nothing at or beyond this depth.
    pub max_depth: usize,
    /// Directories are only descended into while `depth < recurse_depth`.
    pub recurse_depth: usize,
    /// Maximum number of source files collected for one repository.
    pub max_files_per_repo: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            page_size: MAX_PAGE_SIZE,
            max_depth: MAX_TREE_DEPTH,
            recurse_depth: 3,
            max_files_per_repo: MAX_FILES_PER_REPO,
        }
    }
}

impl Limits {
    /// The limits pulled back inside the hard bounds.
    ///
    /// `page_size` lands in `1..=MAX_PAGE_SIZE`, `max_depth` at or below
    /// `MAX_TREE_DEPTH`, `recurse_depth` at or below `max_depth` and
    /// `max_files_per_repo` at or below `MAX_FILES_PER_REPO`.
    pub fn clamped(self) -> Self {
        let max_depth = self.max_depth.min(MAX_TREE_DEPTH);
        Limits {
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            max_depth,
            recurse_depth: self.recurse_depth.min(max_depth),
            max_files_per_repo: self.max_files_per_repo.min(MAX_FILES_PER_REPO),
        }
    }

    /// Reject limits that fall outside the hard bounds instead of clamping them.
    pub fn validate(&self) -> Result<()> {
        let invalid =
            |reason: String| -> Result<()> { Err(DocgenError::InvalidConfig { reason }) };
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return invalid(format!(
                "limits.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if self.max_depth > MAX_TREE_DEPTH {
            return invalid(format!(
                "limits.max_depth must be at most {MAX_TREE_DEPTH}, got {}",
                self.max_depth
            ));
        }
        if self.recurse_depth > self.max_depth {
            return invalid(format!(
                "limits.recurse_depth ({}) must not exceed limits.max_depth ({})",
                self.recurse_depth, self.max_depth
            ));
        }
        if self.max_files_per_repo > MAX_FILES_PER_REPO {
            return invalid(format!(
                "limits.max_files_per_repo must be at most {MAX_FILES_PER_REPO}, got {}",
                self.max_files_per_repo
            ));
        }
        Ok(())
    }
}

/// Fixed delays, in milliseconds, inserted between units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub page_delay_ms: u64,
    pub entry_delay_ms: u64,
    pub repository_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            page_delay_ms: 100,
            entry_delay_ms: 50,
            repository_delay_ms: 500,
        }
    }
}

/// Where the generated database is written. `None` selects the default location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_base_url: String,
    pub limits: Limits,
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            limits: Limits::default(),
            pacing: PacingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn trace_loaded(&self) {
        info!(
            api_base_url = %self.api_base_url,
            page_size = self.limits.page_size,
            max_depth = self.limits.max_depth,
            max_files_per_repo = self.limits.max_files_per_repo,
            "Loaded generator config"
        );
        debug!(?self, "Generator config loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_like_input_keeps_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"limits": {"max_files_per_repo": 10}}"#).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.limits.max_files_per_repo, 10);
        assert_eq!(config.limits.max_depth, 5);
        assert_eq!(config.limits.recurse_depth, 3);
        assert_eq!(config.pacing, PacingConfig::default());
        assert!(config.output.primary.is_none());
    }

    #[test]
    fn defaults_are_within_bounds() {
        assert!(Limits::default().validate().is_ok());
        assert_eq!(Limits::default().clamped(), Limits::default());
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        let too_deep = Limits {
            max_depth: 10,
            recurse_depth: 10,
            ..Limits::default()
        };
        let err = too_deep.validate().unwrap_err();
        assert!(err.to_string().contains("limits.max_depth"));

        let big_page = Limits {
            page_size: 200,
            ..Limits::default()
        };
        assert!(matches!(big_page.validate(), Err(DocgenError::InvalidConfig { .. })));

        let recurse_past_ceiling = Limits {
            max_depth: 2,
            recurse_depth: 3,
            ..Limits::default()
        };
        assert!(recurse_past_ceiling.validate().is_err());

        let many_files = Limits {
            max_files_per_repo: 51,
            ..Limits::default()
        };
        assert!(many_files.validate().is_err());
    }

    #[test]
    fn clamping_pulls_every_limit_inside_the_bounds() {
        let wild = Limits {
            page_size: 0,
            max_depth: 10,
            recurse_depth: 10,
            max_files_per_repo: 500,
        };

        assert_eq!(
            wild.clamped(),
            Limits {
                page_size: 1,
                max_depth: MAX_TREE_DEPTH,
                recurse_depth: MAX_TREE_DEPTH,
                max_files_per_repo: MAX_FILES_PER_REPO,
            }
        );
        assert_eq!(
            Limits {
                page_size: 200,
                ..Limits::default()
            }
            .clamped()
            .page_size,
            MAX_PAGE_SIZE
        );
    }
}

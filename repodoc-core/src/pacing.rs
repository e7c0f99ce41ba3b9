//! Fixed-delay rate limiting.
//!
//! The pipeline never looks at rate-limit headers; it waits a fixed amount after
//! each unit of work. The wait is behind [`Pacing`] so tests can run without
//! sleeping and a smarter strategy can be dropped in without touching call sites.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::PacingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacingUnit {
    /// Between two repository listing pages.
    Page,
    /// After each entry processed by the tree builder.
    TreeEntry,
    /// Between two repositories in a generation run.
    Repository,
}

#[async_trait]
pub trait Pacing: Send + Sync {
    async fn pause(&self, unit: PacingUnit);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacing {
    pub page: Duration,
    pub tree_entry: Duration,
    pub repository: Duration,
}

impl FixedPacing {
    pub fn delay_for(&self, unit: PacingUnit) -> Duration {
        match unit {
            PacingUnit::Page => self.page,
            PacingUnit::TreeEntry => self.tree_entry,
            PacingUnit::Repository => self.repository,
        }
    }
}

impl From<PacingConfig> for FixedPacing {
    fn from(config: PacingConfig) -> Self {
        FixedPacing {
            page: Duration::from_millis(config.page_delay_ms),
            tree_entry: Duration::from_millis(config.entry_delay_ms),
            repository: Duration::from_millis(config.repository_delay_ms),
        }
    }
}

impl Default for FixedPacing {
    fn default() -> Self {
        PacingConfig::default().into()
    }
}

#[async_trait]
impl Pacing for FixedPacing {
    async fn pause(&self, unit: PacingUnit) {
        let delay = self.delay_for(unit);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacing for NoPacing {
    async fn pause(&self, _unit: PacingUnit) {}
}

#![doc = "repodoc-core: pipeline library for repodoc."]

//! Walks every repository a GitHub user owns and builds one documentation
//! database out of them: repository metadata, README, a depth-bounded file tree
//! and the text of recognised source files.
//!
//! # Usage
//! Build a [`client::GitHubClient`], wrap it in a [`database::Generator`] together
//! with a [`pacing::Pacing`] strategy and one or more [`contract::DatabaseSink`]s, and
//! call `generate_combined_documentation` with a [`session::Session`]. Everything
//! below the generator is written against [`contract::GitHubApi`], so any stage can
//! be driven on its own with a mock.

pub mod assemble;
pub mod client;
pub mod config;
pub mod contents;
pub mod contract;
pub mod database;
pub mod error;
pub mod extract;
pub mod identity;
pub mod listing;
pub mod model;
pub mod pacing;
pub mod persist;
pub mod session;
pub mod tree;

#[cfg(any(test, feature = "test-export-mocks"))]
pub mod testing;

pub use error::{DocgenError, Result};

//! Team file search and retrieval library.
//!
//! Searches every member account of a team-scoped storage credential for
//! files matching filename keywords and extensions, and optionally
//! downloads the matches.
//!
//! # Architecture
//!
//! - [`config`] - Credential loading and validation
//! - [`api`] - Provider API boundary: the [`api::TeamApi`] trait and its
//!   HTTP implementation
//! - [`search`] - Filters, bounded retry, per-member enumeration, and the
//!   concurrent fan-out coordinator
//! - [`retrieve`] - Sequential download of matched files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod retrieve;
pub mod search;

// Re-export commonly used types
pub use api::{ApiError, DropboxTeamClient, FileMatch, Member, TeamApi, list_all_members};
pub use config::{ConfigError, Credential, TOKEN_ENV_VAR};
pub use retrieve::Retriever;
pub use search::{
    Coordinator, CoordinatorError, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MEMBER_TIMEOUT, Enumerator, FilterCriteria, RetryPolicy, SearchReport, SearchStats,
};

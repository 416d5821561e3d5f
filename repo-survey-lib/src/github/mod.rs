//! Access to the GitHub GraphQL and REST APIs.
//!
//! All requests share a [`TokenPool`] so that rate-limited credentials are rotated
//! out for every concurrent caller at once.

mod age;
mod client;
mod search;
mod token_pool;
mod tree;

pub use age::fetch_created_at;
pub use client::{ApiResult, Client, GitHubSettings};
pub use search::{DiscoveredRepo, RepoRef, SearchOutcome, search_repositories};
pub use token_pool::TokenPool;
pub use tree::{RepoTree, fetch_raw, fetch_tree};

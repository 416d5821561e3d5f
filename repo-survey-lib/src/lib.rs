#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for repo-survey
//!
//! This library holds all functionality of the repo-survey tool, which finds .NET
//! repositories on GitHub that use a given SDK and architectural style, then clones
//! them one by one to measure their test suites with mutation testing and coverage.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`github`]: GitHub API access with credential rotation
//! - [`scan`]: Resumable discovery and concurrent classification
//! - [`lifecycle`]: Per-repository clone, build, analyze and delete sequence
//! - [`tools`]: External tool invocation and output parsing
//! - [`ledger`]: Resumable result datasets

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod github;
#[cfg(not(any(debug_assertions, test)))]
mod github;

#[cfg(any(debug_assertions, test))]
pub mod ledger;
#[cfg(not(any(debug_assertions, test)))]
mod ledger;

#[cfg(any(debug_assertions, test))]
pub mod lifecycle;
#[cfg(not(any(debug_assertions, test)))]
mod lifecycle;

#[cfg(any(debug_assertions, test))]
pub mod scan;
#[cfg(not(any(debug_assertions, test)))]
mod scan;

#[cfg(any(debug_assertions, test))]
pub mod tools;
#[cfg(not(any(debug_assertions, test)))]
mod tools;

pub use crate::commands::{Host, run};

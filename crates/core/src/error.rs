// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for bord-core operations.

use thiserror::Error;

use crate::engine::DriverError;

/// All possible errors that can occur in bord-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("issue not found: {0}")]
    IssueNotFound(i64),

    #[error("unknown tag: '{0}'\n  hint: valid tags are: QA, BUG, FEATURE, DOCS, PERF")]
    UnknownTag(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: open, in_progress, done, closed")]
    InvalidStatus(String),

    /// Reading array contents back from storage failed at the driver level.
    #[error("Can't get array value: {message}")]
    DataAccess {
        message: String,
        #[source]
        source: DriverError,
    },

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for bord-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

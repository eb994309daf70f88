// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core issue types for the bord issue store.
//!
//! This module contains the fundamental data types: Issue, Status, and Tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Category label attached to an issue.
///
/// Tags form a closed enumeration. Storage holds the exact symbolic name
/// (`"QA"`, `"BUG"`, ...), and parsing is an exact match on that name so
/// that drifted or corrupted values surface as errors instead of being
/// silently folded into a nearby member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    /// Needs attention from quality assurance.
    Qa,
    /// Defect report.
    Bug,
    /// Feature work.
    Feature,
    /// Documentation work.
    Docs,
    /// Performance work.
    Perf,
}

impl Tag {
    /// Returns the symbolic name used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Qa => "QA",
            Tag::Bug => "BUG",
            Tag::Feature => "FEATURE",
            Tag::Docs => "DOCS",
            Tag::Perf => "PERF",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "QA" => Ok(Tag::Qa),
            "BUG" => Ok(Tag::Bug),
            "FEATURE" => Ok(Tag::Feature),
            "DOCS" => Ok(Tag::Docs),
            "PERF" => Ok(Tag::Perf),
            _ => Err(Error::UnknownTag(s.to_string())),
        }
    }
}

/// Workflow status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Open and not yet started. Initial state for new issues.
    Open,
    /// Currently being worked on.
    InProgress,
    /// Successfully completed.
    Done,
    /// Closed without completion (won't fix, duplicate, etc.).
    Closed,
}

impl Status {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Closed => "closed",
        }
    }

    /// Returns true if this is a terminal state (done or closed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            "closed" => Ok(Status::Closed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// The primary entity representing a tracked work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Sequence-assigned identifier (0 until the issue is persisted).
    pub id: i64,
    /// Short description of the work.
    pub title: String,
    /// Longer description providing context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current workflow state.
    pub status: Status,
    /// Category tags. None means no tag information has been recorded,
    /// which is distinct from an empty set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<Tag>>,
    /// When the issue was created.
    pub created_at: DateTime<Utc>,
    /// When the issue was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Creates a new unsaved issue in the `Open` state.
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Issue {
            id: 0,
            title: title.into(),
            description: None,
            status: Status::Open,
            tags: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Sets the status (builder pattern).
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Sets the description (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the tag set (builder pattern).
    pub fn with_tags(mut self, tags: BTreeSet<Tag>) -> Self {
        self.tags = Some(tags);
        self
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;

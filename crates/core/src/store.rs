// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Issue store backed by the embedded engine.
//!
//! The [`Database`] struct provides all data access operations for
//! issues. The tags column is a native array of the `tag` element type;
//! every read and write of that column goes through the
//! [`TagArrayConverter`].

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

use crate::convert::{TagArrayConverter, TAG_ELEMENT_TYPE};
use crate::engine::{Engine, Row, Value};
use crate::error::{Error, Result};
use crate::issue::{Issue, Status, Tag};
use crate::pool::{Pool, PoolConfig};

const ISSUES_TABLE: &str = "issues";

/// Parse an RFC3339 timestamp from storage.
fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            Error::CorruptedData(format!(
                "invalid timestamp '{value}' in column '{column}'"
            ))
        })
}

/// Issue store with pooled connection access.
pub struct Database {
    engine: Engine,
    pool: Pool,
    converter: TagArrayConverter,
}

impl Database {
    /// Opens a store with the default pool configuration.
    pub fn open() -> Result<Self> {
        Self::open_with(PoolConfig::default())
    }

    /// Opens a store, registering the `tag` element type and creating the
    /// issues table.
    pub fn open_with(config: PoolConfig) -> Result<Self> {
        let engine = Engine::open();
        engine.register_element_type(TAG_ELEMENT_TYPE);
        engine.ensure_table(ISSUES_TABLE);
        let pool = Pool::new(engine.clone(), config)?;
        let converter = TagArrayConverter::new(pool.clone());
        Ok(Database {
            engine,
            pool,
            converter,
        })
    }

    /// The converter used for the tags column.
    pub fn converter(&self) -> &TagArrayConverter {
        &self.converter
    }

    /// Persists a new issue and returns it with its assigned id.
    pub fn create_issue(&self, issue: &Issue) -> Result<Issue> {
        self.pool.execute(|conn| {
            // Encoding borrows a connection through the pool; inside this
            // scope it reuses ours.
            let tags = self.converter.to_persisted_value(issue.tags.as_ref())?;
            let mut row = Row::new();
            row.insert("title".to_string(), Value::Text(issue.title.clone()));
            row.insert(
                "description".to_string(),
                match &issue.description {
                    Some(description) => Value::Text(description.clone()),
                    None => Value::Null,
                },
            );
            row.insert(
                "status".to_string(),
                Value::Text(issue.status.as_str().to_string()),
            );
            row.insert(
                "tags".to_string(),
                match tags {
                    Some(array) => Value::Array(array),
                    None => Value::Null,
                },
            );
            row.insert(
                "created_at".to_string(),
                Value::Text(issue.created_at.to_rfc3339()),
            );
            row.insert(
                "updated_at".to_string(),
                Value::Text(issue.updated_at.to_rfc3339()),
            );
            let id = conn.insert(ISSUES_TABLE, row)?;
            debug!(id, title = %issue.title, "issue created");
            Ok(Issue {
                id,
                ..issue.clone()
            })
        })
    }

    /// Fetches an issue by id.
    pub fn get_issue(&self, id: i64) -> Result<Issue> {
        self.pool.execute(|conn| {
            let row = conn
                .get(ISSUES_TABLE, id)?
                .ok_or(Error::IssueNotFound(id))?;
            self.issue_from_row(id, row)
        })
    }

    /// Lists issues in id order, optionally filtered by status.
    pub fn list_issues(&self, status: Option<Status>) -> Result<Vec<Issue>> {
        self.pool.execute(|conn| {
            let mut issues = Vec::new();
            for (id, row) in conn.scan(ISSUES_TABLE)? {
                let issue = self.issue_from_row(id, row)?;
                if status.is_none() || status == Some(issue.status) {
                    issues.push(issue);
                }
            }
            Ok(issues)
        })
    }

    /// Updates an issue's status.
    pub fn update_issue_status(&self, id: i64, status: Status) -> Result<()> {
        self.pool.execute(|conn| {
            let mut row = Row::new();
            row.insert(
                "status".to_string(),
                Value::Text(status.as_str().to_string()),
            );
            row.insert(
                "updated_at".to_string(),
                Value::Text(Utc::now().to_rfc3339()),
            );
            if !conn.update(ISSUES_TABLE, id, row)? {
                return Err(Error::IssueNotFound(id));
            }
            debug!(id, status = %status, "issue status updated");
            Ok(())
        })
    }

    /// Replaces an issue's tag set. Passing None clears the column to NULL.
    pub fn update_issue_tags(&self, id: i64, tags: Option<&BTreeSet<Tag>>) -> Result<()> {
        self.pool.execute(|conn| {
            let array = self.converter.to_persisted_value(tags)?;
            let mut row = Row::new();
            row.insert(
                "tags".to_string(),
                match array {
                    Some(array) => Value::Array(array),
                    None => Value::Null,
                },
            );
            row.insert(
                "updated_at".to_string(),
                Value::Text(Utc::now().to_rfc3339()),
            );
            if !conn.update(ISSUES_TABLE, id, row)? {
                return Err(Error::IssueNotFound(id));
            }
            debug!(id, "issue tags updated");
            Ok(())
        })
    }

    /// Shuts down the pool and the engine.
    pub fn close(&self) {
        self.pool.close();
        self.engine.close();
    }

    fn issue_from_row(&self, id: i64, mut row: Row) -> Result<Issue> {
        let title = match row.remove("title") {
            Some(Value::Text(title)) => title,
            _ => {
                return Err(Error::CorruptedData(format!("issue {id} has no title")));
            }
        };
        let description = match row.remove("description") {
            Some(Value::Text(description)) => Some(description),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(Error::CorruptedData(format!(
                    "invalid description for issue {id}: {other:?}"
                )));
            }
        };
        let status = match row.remove("status") {
            Some(Value::Text(status)) => status.parse()?,
            _ => {
                return Err(Error::CorruptedData(format!("issue {id} has no status")));
            }
        };
        // A NULL tags column decodes to the empty set.
        let tags = match row.remove("tags") {
            Some(Value::Array(array)) => self.converter.to_entity_value(Some(&array))?,
            Some(Value::Null) | None => self.converter.to_entity_value(None)?,
            Some(other) => {
                return Err(Error::CorruptedData(format!(
                    "invalid tags for issue {id}: {other:?}"
                )));
            }
        };
        let created_at = match row.remove("created_at") {
            Some(Value::Text(value)) => parse_timestamp(&value, "created_at")?,
            _ => {
                return Err(Error::CorruptedData(format!(
                    "issue {id} has no created_at"
                )));
            }
        };
        let updated_at = match row.remove("updated_at") {
            Some(Value::Text(value)) => parse_timestamp(&value, "updated_at")?,
            _ => {
                return Err(Error::CorruptedData(format!(
                    "issue {id} has no updated_at"
                )));
            }
        };
        Ok(Issue {
            id,
            title,
            description,
            status,
            tags: Some(tags),
            created_at,
            updated_at,
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

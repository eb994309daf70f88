// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Converts between an issue's tag set and the engine's native array type.
//!
//! Array values can only be constructed on a live connection, so the
//! encode path borrows one through the pool for the duration of the
//! construction call. The decode path operates on the handle alone.

use std::collections::BTreeSet;

use crate::engine::SqlArray;
use crate::error::{Error, Result};
use crate::issue::Tag;
use crate::pool::Pool;

/// Logical element type name for persisted tag arrays.
pub const TAG_ELEMENT_TYPE: &str = "tag";

/// Converter between `Set<Tag>` and the engine's native array value.
///
/// Stateless across invocations; clones share the underlying pool and
/// concurrent conversions are independent.
#[derive(Debug, Clone)]
pub struct TagArrayConverter {
    pool: Pool,
}

impl TagArrayConverter {
    /// The pool is needed to reach a live connection; array construction
    /// is a connection operation.
    pub fn new(pool: Pool) -> Self {
        TagArrayConverter { pool }
    }

    /// Converts a tag set into a persisted array value.
    ///
    /// An absent set persists as NULL (`Ok(None)`), never as an empty
    /// array. An empty set persists as a zero-length array. The input is
    /// not mutated; element order in the array follows set order and
    /// carries no meaning.
    pub fn to_persisted_value(&self, tags: Option<&BTreeSet<Tag>>) -> Result<Option<SqlArray>> {
        let Some(tags) = tags else {
            return Ok(None);
        };
        let values: Vec<String> = tags.iter().map(|tag| tag.as_str().to_string()).collect();
        let array = self
            .pool
            .execute(|conn| Ok(conn.create_array(TAG_ELEMENT_TYPE, &values)?))?;
        Ok(Some(array))
    }

    /// Converts a persisted array value back into a tag set.
    ///
    /// A missing array decodes to the empty set. Extraction failures
    /// surface as [`Error::DataAccess`] with the driver failure as the
    /// cause. An element that names no known tag fails the whole
    /// conversion; a partial set is never returned. Duplicate elements
    /// collapse into one member.
    pub fn to_entity_value(&self, array: Option<&SqlArray>) -> Result<BTreeSet<Tag>> {
        let Some(array) = array else {
            return Ok(BTreeSet::new());
        };
        let elements = array.text_elements().map_err(|source| Error::DataAccess {
            message: source.to_string(),
            source,
        })?;
        elements.iter().map(|raw| raw.parse::<Tag>()).collect()
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded relational engine with native typed-array values.
//!
//! The engine stores rows in named tables keyed by a per-table sequence.
//! Its distinguishing capability is the native array column type: an
//! array value is constructed on a live [`Conn`] and handed back as an
//! opaque [`SqlArray`] handle. The handle references storage owned by the
//! engine; it stays valid until it is dropped or the engine shuts down,
//! and callers must not assume it outlives the operation that produced it.
//!
//! Array-valued columns are materialized by value on insert. Reads mint a
//! fresh handle per array column, so a row fetched twice yields two
//! independent handles over the same stored elements.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Failures reported by the storage driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("engine is closed")]
    Closed,

    #[error("unknown array element type: '{0}'")]
    UnknownElementType(String),

    #[error("no such table: '{0}'")]
    NoSuchTable(String),

    #[error("array value has been released")]
    ArrayReleased,
}

/// A single column value, as bound on writes and returned on reads.
#[derive(Debug)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Array(SqlArray),
}

/// A row image: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Stored representation of a column value. Arrays are held by value so
/// rows survive the handles that wrote them.
#[derive(Debug, Clone)]
enum Stored {
    Null,
    Integer(i64),
    Text(String),
    Array {
        element_type: String,
        elements: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, BTreeMap<String, Stored>>,
}

#[derive(Debug, Clone)]
struct ArrayEntry {
    elements: Vec<String>,
}

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    element_types: Mutex<HashSet<String>>,
    tables: Mutex<HashMap<String, Table>>,
    arrays: Mutex<HashMap<u64, ArrayEntry>>,
    next_array_id: AtomicU64,
}

impl Shared {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }
}

/// Handle to an engine instance. Cloning is cheap; all clones share state.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Opens a fresh engine with the built-in `text` element type.
    pub fn open() -> Self {
        let mut element_types = HashSet::new();
        element_types.insert("text".to_string());
        Engine {
            shared: Arc::new(Shared {
                closed: AtomicBool::new(false),
                element_types: Mutex::new(element_types),
                tables: Mutex::new(HashMap::new()),
                arrays: Mutex::new(HashMap::new()),
                next_array_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a logical element type name for array construction.
    pub fn register_element_type(&self, name: &str) {
        self.shared
            .element_types
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }

    /// Creates the named table if it does not already exist.
    pub fn ensure_table(&self, name: &str) {
        self.shared
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default();
    }

    /// Mints a new connection.
    pub fn connect(&self) -> Result<Conn, DriverError> {
        self.shared.ensure_open()?;
        Ok(Conn {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Shuts the engine down. Outstanding array handles become invalid and
    /// every subsequent driver call fails with [`DriverError::Closed`].
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared
            .arrays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns true once [`Engine::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

/// A live connection to the engine.
///
/// Connections are handed out by the pool; they are cheap handles and
/// carry no transaction state of their own.
#[derive(Debug, Clone)]
pub struct Conn {
    shared: Arc<Shared>,
}

impl Conn {
    /// Constructs a native array value of the given logical element type.
    ///
    /// The element type name must have been registered on the engine.
    /// A zero-length input produces a valid zero-length array.
    pub fn create_array(
        &self,
        element_type: &str,
        values: &[String],
    ) -> Result<SqlArray, DriverError> {
        self.shared.ensure_open()?;
        {
            let known = self
                .shared
                .element_types
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !known.contains(element_type) {
                return Err(DriverError::UnknownElementType(element_type.to_string()));
            }
        }
        Ok(self.mint_array(element_type, values.to_vec()))
    }

    /// Inserts a row, assigning and returning the table's next sequence id.
    pub fn insert(&self, table: &str, row: Row) -> Result<i64, DriverError> {
        self.shared.ensure_open()?;
        let stored = self.materialize(row)?;
        let mut tables = self
            .shared
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get_mut(table)
            .ok_or_else(|| DriverError::NoSuchTable(table.to_string()))?;
        table.next_id += 1;
        let id = table.next_id;
        table.rows.insert(id, stored);
        Ok(id)
    }

    /// Fetches a row by id, or None if it does not exist.
    pub fn get(&self, table: &str, id: i64) -> Result<Option<Row>, DriverError> {
        self.shared.ensure_open()?;
        let stored = {
            let tables = self
                .shared
                .tables
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let table = tables
                .get(table)
                .ok_or_else(|| DriverError::NoSuchTable(table.to_string()))?;
            table.rows.get(&id).cloned()
        };
        Ok(stored.map(|row| self.project(row)))
    }

    /// Merges the given columns into an existing row. Returns false if the
    /// row does not exist.
    pub fn update(&self, table: &str, id: i64, row: Row) -> Result<bool, DriverError> {
        self.shared.ensure_open()?;
        let stored = self.materialize(row)?;
        let mut tables = self
            .shared
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get_mut(table)
            .ok_or_else(|| DriverError::NoSuchTable(table.to_string()))?;
        match table.rows.get_mut(&id) {
            Some(existing) => {
                existing.extend(stored);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns every row in the table in id order.
    pub fn scan(&self, table: &str) -> Result<Vec<(i64, Row)>, DriverError> {
        self.shared.ensure_open()?;
        let rows: Vec<(i64, BTreeMap<String, Stored>)> = {
            let tables = self
                .shared
                .tables
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let table = tables
                .get(table)
                .ok_or_else(|| DriverError::NoSuchTable(table.to_string()))?;
            table
                .rows
                .iter()
                .map(|(id, row)| (*id, row.clone()))
                .collect()
        };
        Ok(rows
            .into_iter()
            .map(|(id, row)| (id, self.project(row)))
            .collect())
    }

    /// Allocates a registry entry and wraps it in a handle. Callers have
    /// already validated the element type (or are re-minting stored data).
    fn mint_array(&self, element_type: &str, elements: Vec<String>) -> SqlArray {
        let id = self.shared.next_array_id.fetch_add(1, Ordering::Relaxed);
        self.shared
            .arrays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, ArrayEntry { elements });
        SqlArray {
            id,
            element_type: element_type.to_string(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolves bound values into their stored representation, copying
    /// array contents out of the handles that carried them.
    fn materialize(&self, row: Row) -> Result<BTreeMap<String, Stored>, DriverError> {
        let mut stored = BTreeMap::new();
        for (column, value) in row {
            let resolved = match value {
                Value::Null => Stored::Null,
                Value::Integer(n) => Stored::Integer(n),
                Value::Text(s) => Stored::Text(s),
                Value::Array(array) => {
                    let entry = {
                        let arrays = self
                            .shared
                            .arrays
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        arrays.get(&array.id).cloned()
                    };
                    let entry = entry.ok_or(DriverError::ArrayReleased)?;
                    Stored::Array {
                        element_type: array.element_type.clone(),
                        elements: entry.elements,
                    }
                }
            };
            stored.insert(column, resolved);
        }
        Ok(stored)
    }

    /// Projects a stored row into bound values, minting a fresh handle for
    /// each array column.
    fn project(&self, row: BTreeMap<String, Stored>) -> Row {
        row.into_iter()
            .map(|(column, stored)| {
                let value = match stored {
                    Stored::Null => Value::Null,
                    Stored::Integer(n) => Value::Integer(n),
                    Stored::Text(s) => Value::Text(s),
                    Stored::Array {
                        element_type,
                        elements,
                    } => Value::Array(self.mint_array(&element_type, elements)),
                };
                (column, value)
            })
            .collect()
    }
}

/// Opaque handle to a native array value owned by the engine.
///
/// The handle is scoped to the engine lifetime: extraction fails once the
/// engine has shut down, and dropping the handle releases the underlying
/// value (the analogue of an explicit `free`). Handles are not cloneable.
pub struct SqlArray {
    id: u64,
    element_type: String,
    shared: Arc<Shared>,
}

impl SqlArray {
    /// Logical element type name the array was constructed with.
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Extracts the raw elements as text values, exactly as stored
    /// (duplicates and order preserved).
    pub fn text_elements(&self) -> Result<Vec<String>, DriverError> {
        self.shared.ensure_open()?;
        let arrays = self
            .shared
            .arrays
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        arrays
            .get(&self.id)
            .map(|entry| entry.elements.clone())
            .ok_or(DriverError::ArrayReleased)
    }
}

impl fmt::Debug for SqlArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlArray")
            .field("id", &self.id)
            .field("element_type", &self.element_type)
            .finish()
    }
}

impl Drop for SqlArray {
    fn drop(&mut self) {
        self.shared
            .arrays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

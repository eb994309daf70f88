// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped connection access for the embedded engine.
//!
//! [`Pool::execute`] is the only way callers touch a connection: it
//! borrows one, runs the unit of work, and returns the connection on
//! every exit path, including panics, via a drop guard. Scopes are
//! reentrant per thread, so a conversion invoked inside a store operation
//! reuses the operation's connection instead of deadlocking on a second
//! checkout.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::{Conn, DriverError, Engine};
use crate::error::Result;

/// Connection pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections held by the pool. Values below 1 are
    /// treated as 1.
    pub max_connections: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig { max_connections: 4 }
    }
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Connections currently held by scopes on this thread, innermost
    /// last, tagged with the owning pool's id.
    static ACTIVE: RefCell<Vec<(u64, Conn)>> = const { RefCell::new(Vec::new()) };
}

/// Fixed-size connection pool over an [`Engine`].
///
/// Cloning is cheap; all clones share the same connections.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: u64,
    engine: Engine,
    closed: AtomicBool,
    idle: Mutex<VecDeque<Conn>>,
    available: Condvar,
}

impl Pool {
    /// Opens `config.max_connections` connections up front.
    pub fn new(engine: Engine, config: PoolConfig) -> Result<Self> {
        let size = config.max_connections.max(1);
        let mut idle = VecDeque::with_capacity(size);
        for _ in 0..size {
            idle.push_back(engine.connect()?);
        }
        Ok(Pool {
            inner: Arc::new(Inner {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
                engine,
                closed: AtomicBool::new(false),
                idle: Mutex::new(idle),
                available: Condvar::new(),
            }),
        })
    }

    /// Runs a unit of work with a live connection.
    ///
    /// If this thread is already inside an `execute` scope of this pool,
    /// the scope's connection is reused and release is deferred to the
    /// outermost scope. Otherwise a connection is checked out, and
    /// returned when the work finishes, fails, or panics. When every
    /// connection is in use by other threads, the call blocks until one
    /// is released.
    pub fn execute<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Conn) -> Result<T>,
    {
        let current = ACTIVE.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|(pool, _)| *pool == self.inner.id)
                .map(|(_, conn)| conn.clone())
        });
        if let Some(conn) = current {
            return work(&conn);
        }

        let conn = self.checkout()?;
        ACTIVE.with(|stack| stack.borrow_mut().push((self.inner.id, conn.clone())));
        let _guard = ScopeGuard {
            pool: self,
            conn: Some(conn.clone()),
        };
        work(&conn)
    }

    /// Marks the pool closed and wakes blocked acquirers. Held
    /// connections still drain back normally when their scopes end.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.available.notify_all();
    }

    fn checkout(&self) -> Result<Conn> {
        let mut idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.inner.closed.load(Ordering::Acquire) || self.inner.engine.is_closed() {
                return Err(DriverError::Closed.into());
            }
            if let Some(conn) = idle.pop_front() {
                trace!(pool = self.inner.id, "connection checked out");
                return Ok(conn);
            }
            idle = self
                .inner
                .available
                .wait(idle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self, conn: Conn) {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(conn);
        trace!(pool = self.inner.id, "connection released");
        self.inner.available.notify_one();
    }
}

/// Returns the scope's connection to the pool when the scope unwinds,
/// whether by return, error, or panic.
struct ScopeGuard<'a> {
    pool: &'a Pool,
    conn: Option<Conn>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;

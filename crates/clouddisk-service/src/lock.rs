//! Hierarchical async path locks.
//!
//! A mutating operation holds an exclusive lock on every path it writes
//! (both paths for a rename) and a shared lock on each ancestor of those
//! paths, from the existence check until the catalog write and any
//! compensation have finished. Renaming or deleting a folder therefore
//! waits for, and blocks, every operation below it, while operations in
//! sibling folders only share ancestors and run side by side.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::path::parent_path_of;

type LockTable = DashMap<String, Arc<RwLock<()>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shared,
    Exclusive,
}

/// Registry of path locks shared by all coordinator services.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Arc<LockTable>,
}

/// Holds a set of path locks until dropped.
#[derive(Debug)]
pub struct PathGuard {
    held: Vec<(String, Held)>,
    locks: Arc<LockTable>,
}

#[derive(Debug)]
enum Held {
    Shared { _guard: OwnedRwLockReadGuard<()> },
    Exclusive { _guard: OwnedRwLockWriteGuard<()> },
}

impl PathLocks {
    /// Creates an empty lock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock one path exclusively and its ancestors shared.
    pub async fn lock(&self, path: &str) -> PathGuard {
        self.lock_many(&[path]).await
    }

    /// Lock several paths exclusively and all their ancestors shared.
    ///
    /// Locks are always taken in sorted path order.
    pub async fn lock_many(&self, paths: &[&str]) -> PathGuard {
        let mut plan: BTreeMap<String, Mode> = BTreeMap::new();
        for path in paths {
            plan.insert((*path).to_string(), Mode::Exclusive);
            let mut current = *path;
            while let Some(parent) = parent_path_of(current) {
                plan.entry(parent.to_string()).or_insert(Mode::Shared);
                current = parent;
            }
        }

        let mut held = Vec::with_capacity(plan.len());
        for (path, mode) in plan {
            let lock = Arc::clone(
                self.locks
                    .entry(path.clone())
                    .or_insert_with(|| Arc::new(RwLock::new(())))
                    .value(),
            );
            let guard = match mode {
                Mode::Shared => Held::Shared {
                    _guard: lock.read_owned().await,
                },
                Mode::Exclusive => Held::Exclusive {
                    _guard: lock.write_owned().await,
                },
            };
            held.push((path, guard));
        }

        PathGuard {
            held,
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of paths with a holder or waiter.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        for (path, guard) in self.held.drain(..).rev() {
            drop(guard);
            self.locks
                .remove_if(&path, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

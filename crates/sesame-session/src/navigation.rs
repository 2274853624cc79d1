//! Navigation hook: where the user currently is, and how to send them
//! somewhere else.
//!
//! The session never pushes history entries. Every redirect it performs is
//! `set_path` followed by `replace`, so "back" after a login does not land
//! on the login page again.

use parking_lot::Mutex;

/// The host's router, seen from the session.
pub trait Navigator: Send + Sync {
    /// Current path.
    fn path(&self) -> String;

    /// Starts navigating to `path`.
    fn set_path(&self, path: &str);

    /// Commits the last [`set_path`](Self::set_path) as a replacement of
    /// the current history entry instead of a new one.
    fn replace(&self);
}

// ---------------------------------------------------------------------------
// MemoryNavigator
// ---------------------------------------------------------------------------

/// A [`Navigator`] that keeps its history in memory.
///
/// Useful for headless hosts (CLIs, services that only need the redirect
/// decisions) and for tests, which can inspect the history and count
/// replacements.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<History>,
}

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    /// `true` between a `set_path` and the next `replace`.
    uncommitted: bool,
    set_paths: Vec<String>,
    replace_count: usize,
}

impl MemoryNavigator {
    /// Creates a navigator whose history holds only `initial_path`.
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(History {
                entries: vec![initial_path.into()],
                uncommitted: false,
                set_paths: Vec::new(),
                replace_count: 0,
            }),
        }
    }

    /// History entries, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    /// Every path passed to `set_path`, in order.
    pub fn set_paths(&self) -> Vec<String> {
        self.inner.lock().set_paths.clone()
    }

    /// How many times `replace` was called.
    pub fn replace_count(&self) -> usize {
        self.inner.lock().replace_count
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn path(&self) -> String {
        self.inner
            .lock()
            .entries
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn set_path(&self, path: &str) {
        let mut history = self.inner.lock();
        history.entries.push(path.to_string());
        history.set_paths.push(path.to_string());
        history.uncommitted = true;
    }

    fn replace(&self) {
        let mut history = self.inner.lock();
        history.replace_count += 1;
        // Drop the entry the new path was pushed on top of.
        if history.uncommitted && history.entries.len() >= 2 {
            let replaced = history.entries.len() - 2;
            history.entries.remove(replaced);
        }
        history.uncommitted = false;
    }
}

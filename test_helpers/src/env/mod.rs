//! Serialised, restoring access to process environment variables.
//!
//! Every helper takes one global re-entrant lock. Guards returned by
//! [`remove_var`] and [`set_var`] put the previous value back when dropped.
//! Tests whose code under test writes the environment itself, such as an
//! env mirror exporting a snapshot, should hold an [`EnvLock`] for the
//! whole test so no other helper user interleaves with those writes.
//!
//! # Examples
//!
//! ```
//! use konfig_test_helpers::env;
//!
//! let lock = env::lock();
//! let _cleared = lock.remove_var("KONFIG_DOC_LEVEL");
//! assert_eq!(env::var("KONFIG_DOC_LEVEL"), None);
//! ```

use std::env as std_env;
use std::ffi::OsString;
use std::fmt;
use std::sync::LazyLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

fn write(key: &str, value: Option<&OsString>) {
    let _guard = ENV_MUTEX.lock();
    match value {
        // SAFETY: writes made through this module hold `ENV_MUTEX`.
        Some(text) => unsafe { std_env::set_var(key, text) },
        // SAFETY: as above.
        None => unsafe { std_env::remove_var(key) },
    }
}

fn replace(key: String, value: Option<OsString>) -> EnvVarGuard {
    let _guard = ENV_MUTEX.lock();
    let original = std_env::var_os(&key);
    write(&key, value.as_ref());
    EnvVarGuard { key, original }
}

/// Restores one variable to the value it had before the guard was created.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl EnvVarGuard {
    /// Name of the guarded variable.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        write(&self.key, self.original.as_ref());
    }
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish()
    }
}

/// Holds the environment lock until dropped.
#[must_use = "dropping releases the environment lock"]
pub struct EnvLock {
    _guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvLock {
    /// Set `key` while holding the lock.
    pub fn set_var(&self, key: impl Into<String>, value: impl Into<OsString>) -> EnvVarGuard {
        replace(key.into(), Some(value.into()))
    }

    /// Remove `key` while holding the lock.
    pub fn remove_var(&self, key: impl Into<String>) -> EnvVarGuard {
        replace(key.into(), None)
    }
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

/// Acquire the environment lock.
pub fn lock() -> EnvLock {
    EnvLock {
        _guard: ENV_MUTEX.lock(),
    }
}

/// Set `key` and return a guard restoring its prior value.
pub fn set_var(key: impl Into<String>, value: impl Into<OsString>) -> EnvVarGuard {
    replace(key.into(), Some(value.into()))
}

/// Remove `key` and return a guard restoring its prior value.
pub fn remove_var(key: impl Into<String>) -> EnvVarGuard {
    replace(key.into(), None)
}

/// Read `key` under the lock. Values that are not UTF-8 read as `None`.
#[must_use]
pub fn var(key: &str) -> Option<String> {
    let _guard = ENV_MUTEX.lock();
    std_env::var(key).ok()
}

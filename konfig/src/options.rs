//! Store options and their loading from the environment.

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use crate::error::KonfigResult;
use crate::key::KeyPath;

/// Prefix for environment variables read by [`KonfigOptions::load`].
pub const ENV_PREFIX: &str = "KONFIG_";

/// Default capacity of the informer event queue.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Which ConfigMap to follow and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KonfigOptions {
    /// ConfigMap name.
    pub name: String,
    /// ConfigMap namespace.
    pub namespace: String,
    /// Capacity of the queue between informer callbacks and the pump.
    pub buffer_capacity: usize,
    /// Dot-separated key path to mirror into the environment on start.
    pub env_mount: Option<String>,
}

impl KonfigOptions {
    /// Options for the named ConfigMap with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Load options from `KONFIG_*` environment variables over the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`KonfigError::Options`](crate::KonfigError::Options) when a
    /// variable cannot be converted to its field type.
    pub fn load() -> KonfigResult<Self> {
        Self::figment(Self::default()).extract().map_err(Into::into)
    }

    /// Load options, starting from `base` instead of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`KonfigError::Options`](crate::KonfigError::Options) when a
    /// variable cannot be converted to its field type.
    pub fn load_over(base: Self) -> KonfigResult<Self> {
        Self::figment(base).extract().map_err(Into::into)
    }

    fn figment(base: Self) -> Figment {
        Figment::from(Serialized::defaults(base)).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Override the informer queue capacity. Zero is raised to one.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Mirror `path` into the environment once the store starts.
    #[must_use]
    pub fn with_env_mount(mut self, path: impl Into<String>) -> Self {
        self.env_mount = Some(path.into());
        self
    }

    /// The configured env mount as a key path.
    #[must_use]
    pub fn env_mount_path(&self) -> Option<KeyPath> {
        self.env_mount.as_deref().map(KeyPath::parse_dotted)
    }
}

impl Default for KonfigOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            namespace: "default".to_owned(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            env_mount: None,
        }
    }
}

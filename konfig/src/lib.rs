//! A locally cached, continuously updated view of a Kubernetes ConfigMap.
//!
//! [`Konfig`] keeps the latest parsed state of one ConfigMap and serves it
//! three ways:
//!
//! - scalar reads by key path with weak coercion ([`Konfig::get_int64`],
//!   [`Konfig::get_bool`], and friends),
//! - typed views decoded through serde that are re-decoded on every update
//!   ([`Konfig::register`]),
//! - an optional mirror of one subtree into environment variables
//!   ([`Konfig::mount_env`]).
//!
//! A field whose text starts with a `---` line is parsed as a YAML mapping
//! and can be addressed by nested key paths; every other field is a string
//! leaf.
//!
//! Updates are applied by a single background task fed either by a watch
//! stream from a [`ConfigMapSource`] or by shared-informer callbacks through
//! an [`InformerHandle`]. Reads never block on it.
//!
//! Every read returns a revision next to its value. Negative revisions are
//! the sentinels [`NOT_FOUND`] and [`PARSE_FAILED`].

pub mod decode;
pub mod env;
mod error;
pub mod index;
pub mod key;
pub mod options;
pub mod pump;
pub mod revision;
pub mod snapshot;
pub mod source;
mod store;
pub mod value;
mod view;

pub use decode::{DecodeError, FieldTag, decode_value};
pub use env::{EnvMirror, EnvSink, MemoryEnv, ProcessEnv};
pub use error::{BoxError, KonfigError, KonfigResult};
pub use key::KeyPath;
pub use options::KonfigOptions;
pub use pump::{DeliveryMode, PumpState};
pub use revision::{EMPTY, NOT_FOUND, PARSE_FAILED};
pub use snapshot::{Snapshot, SnapshotStore};
pub use source::{ConfigMap, ConfigMapSource, EventKind, EventStream, InformerHandle, WatchEvent};
pub use store::{Konfig, KonfigBuilder};
pub use value::{Mapping, Value};

//! Typed views that stay decoded against the latest snapshot.
//!
//! Each registered view owns one key path and one destination type. The
//! update pump re-decodes every view after each publish; readers load the
//! latest outcome without locking.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::decode::{DecodeError, FieldTag, decode_value};
use crate::index::KeyIndex;
use crate::key::KeyPath;
use crate::revision::{NOT_FOUND, PARSE_FAILED};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Outcome of decoding the subtree at a key path.
#[derive(Debug)]
pub(crate) enum Decoded<T> {
    /// Decoded at the given snapshot revision.
    Value(T, i64),
    /// The key path is absent.
    NotFound,
    /// The subtree is not a mapping or does not fit `T`.
    ParseFailed(DecodeError),
}

/// Decode the subtree at `keys` in `snapshot` into a fresh `T`.
pub(crate) fn decode_at<T, S>(snapshot: &Snapshot, keys: &[S], tag: FieldTag) -> Decoded<T>
where
    T: DeserializeOwned,
    S: AsRef<str>,
{
    let Some(subtree) = snapshot.lookup(keys) else {
        return Decoded::NotFound;
    };
    if subtree.as_map().is_none() {
        return Decoded::ParseFailed(DecodeError::invalid(subtree, "map"));
    }
    match decode_value(subtree, tag) {
        Ok(value) => Decoded::Value(value, snapshot.revision()),
        Err(err) => Decoded::ParseFailed(err),
    }
}

/// Instance and revision published together so readers never pair one
/// decode's object with another decode's revision.
struct ViewState<T> {
    instance: Arc<T>,
    revision: i64,
}

struct TypedView<T> {
    path: KeyPath,
    tag: FieldTag,
    state: ArcSwap<ViewState<T>>,
    /// Generation of the last snapshot applied; serialises re-decodes.
    applied: Mutex<Option<u64>>,
}

impl<T> TypedView<T>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    fn new(path: KeyPath, tag: FieldTag) -> Self {
        Self {
            path,
            tag,
            state: ArcSwap::from_pointee(ViewState {
                instance: Arc::new(T::default()),
                revision: NOT_FOUND,
            }),
            applied: Mutex::new(None),
        }
    }

    fn load(&self) -> (Arc<T>, i64) {
        let state = self.state.load();
        (Arc::clone(&state.instance), state.revision)
    }

    fn apply(&self, snapshot: &Snapshot) -> i64 {
        let mut applied = self.applied.lock();
        if applied.is_some_and(|generation| generation > snapshot.generation()) {
            return self.state.load().revision;
        }
        *applied = Some(snapshot.generation());
        let next = match decode_at::<T, _>(snapshot, self.path.segments(), self.tag) {
            Decoded::Value(instance, revision) => ViewState {
                instance: Arc::new(instance),
                revision,
            },
            Decoded::NotFound => ViewState {
                instance: Arc::new(T::default()),
                revision: NOT_FOUND,
            },
            Decoded::ParseFailed(err) => {
                warn!(
                    path = %self.path,
                    revision = snapshot.revision(),
                    error = %err,
                    "registered view failed to decode; keeping the previous instance"
                );
                ViewState {
                    instance: Arc::clone(&self.state.load().instance),
                    revision: PARSE_FAILED,
                }
            }
        };
        let revision = next.revision;
        self.state.store(Arc::new(next));
        revision
    }
}

/// Type-erased view so one index can hold every destination type.
trait ErasedView: Send + Sync {
    fn refresh(&self, snapshot: &Snapshot) -> i64;
    fn tag(&self) -> FieldTag;
    fn type_id_of_target(&self) -> TypeId;
    fn as_any(&self) -> &dyn Any;
}

impl<T> ErasedView for TypedView<T>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    fn refresh(&self, snapshot: &Snapshot) -> i64 {
        self.apply(snapshot)
    }

    fn tag(&self) -> FieldTag {
        self.tag
    }

    fn type_id_of_target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// All registered views, indexed by key path.
#[derive(Default)]
pub(crate) struct ViewRegistry {
    views: KeyIndex<dyn ErasedView>,
}

impl ViewRegistry {
    /// Register `T` at `path`, decode it against the current snapshot and
    /// return the outcome.
    ///
    /// Registering the same type and tag again returns the existing view;
    /// anything else registered at the path replaces it.
    pub(crate) fn register<T>(
        &self,
        store: &SnapshotStore,
        path: KeyPath,
        tag: FieldTag,
    ) -> (Arc<T>, i64)
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        if let Some(existing) = self.views.load(&path) {
            if existing.tag() == tag && existing.type_id_of_target() == TypeId::of::<T>() {
                if let Some(view) = existing.as_any().downcast_ref::<TypedView<T>>() {
                    return view.load();
                }
            }
        }

        let view = Arc::new(TypedView::<T>::new(path.clone(), tag));
        let decoded_against = store.current();
        view.apply(&decoded_against);
        let erased: Arc<dyn ErasedView> = view.clone();
        self.views.store(path, erased);

        // A publish may have landed between the decode and the insert, and
        // the pump's traversal may have missed the new view.
        let latest = store.current();
        if !Arc::ptr_eq(&latest, &decoded_against) {
            view.apply(&latest);
        }
        view.load()
    }

    /// The latest outcome of the view registered at `path`, if it was
    /// registered with type `T`.
    pub(crate) fn get<T>(&self, path: &KeyPath) -> Option<(Arc<T>, i64)>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        let view = self.views.load(path)?;
        view.as_any()
            .downcast_ref::<TypedView<T>>()
            .map(TypedView::load)
    }

    /// Re-decode every view against `snapshot`, returning how many were
    /// visited.
    pub(crate) fn refresh_all(&self, snapshot: &Snapshot) -> usize {
        let mut visited = 0;
        self.views.range(|_, view| {
            view.refresh(snapshot);
            visited += 1;
            true
        });
        visited
    }

    pub(crate) fn len(&self) -> usize {
        self.views.len()
    }
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("views", &self.len())
            .finish()
    }
}

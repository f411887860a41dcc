//! Dependency registry.
//!
//! A map from [`Id`] to one of three kinds of entry:
//!
//! | Kind | Registered with | `get` returns |
//! |---|---|---|
//! | Instance | [`Registry::add`] | the stored value |
//! | Factory | [`Registry::add_factory`] | the factory's product (cached when shared) |
//! | Alias | [`Registry::alias`] | whatever the target resolves to |
//!
//! Ids are either strings or type tags. Values come back as `Arc<T>`, so a
//! shared entry resolved twice yields the same allocation.
//!
//! An external [`Container`] can back the registry: named ids the registry
//! does not hold itself are looked up there.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;

/// Alias chains longer than this are treated as cycles.
const MAX_ALIAS_DEPTH: usize = 32;

type Shared = Arc<dyn Any + Send + Sync>;
type Build = Arc<dyn Fn(&Registry) -> Result<Shared, RegistryError> + Send + Sync>;

/// The literal form of a factory, returned by `get` for entries marked
/// [`as_is`](Registration::as_is).
pub type Constructor<T> = Arc<dyn Fn(&Registry) -> Result<T, RegistryError> + Send + Sync>;

// ── Id ────────────────────────────────────────────────────────────────────────

/// Registry key.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Id {
    Name(String),
    Type(TypeId, &'static str),
}

impl Id {
    /// The canonical id of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Type(_, name) => f.write_str(name),
        }
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self { Self::Name(s.to_owned()) }
}

impl From<String> for Id {
    fn from(s: String) -> Self { Self::Name(s) }
}

impl From<&String> for Id {
    fn from(s: &String) -> Self { Self::Name(s.clone()) }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("`{0}` is not registered")]
    NotFound(Id),

    #[error("`{id}` does not hold a `{expected}`")]
    TypeMismatch { id: Id, expected: &'static str },

    #[error("alias chain starting at `{0}` does not terminate")]
    AliasCycle(Id),

    #[error("factory for `{0}` depends on itself")]
    FactoryCycle(Id),

    #[error("building `{id}`: {reason}")]
    Build { id: Id, reason: String },
}

// ── Container ─────────────────────────────────────────────────────────────────

/// A third-party container the registry can fall back to.
pub trait Container: Send + Sync {
    fn has(&self, id: &str) -> bool;
    fn get(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

// ── Entries ───────────────────────────────────────────────────────────────────

enum Kind {
    Value(Shared),
    Factory { build: Build, literal: Shared },
    Alias(Id),
}

struct Entry {
    kind: Kind,
    shared: bool,
    as_is: bool,
    cache: OnceCell<Shared>,
}

impl Entry {
    fn new(kind: Kind) -> Self {
        Self { kind, shared: true, as_is: false, cache: OnceCell::new() }
    }
}

/// Handle returned by every registration call; adjusts how the entry resolves.
pub struct Registration<'a> {
    entry: &'a mut Entry,
}

impl Registration<'_> {
    /// Store the value literally. For factories, `get` returns the
    /// [`Constructor`] itself instead of invoking it.
    pub fn as_is(self) -> Self {
        self.entry.as_is = true;
        self
    }

    /// Invoke a factory once and reuse its product. The default.
    pub fn shared(self) -> Self {
        self.entry.shared = true;
        self
    }

    /// Invoke a factory on every `get`.
    pub fn transient(self) -> Self {
        self.entry.shared = false;
        self
    }
}

impl fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("shared", &self.entry.shared)
            .field("as_is", &self.entry.as_is)
            .finish()
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Registry {
    entries: HashMap<Id, Entry>,
    container: Option<Box<dyn Container>>,
    /// Factories currently running, per calling thread.
    building: Mutex<HashSet<(ThreadId, Id)>>,
}

/// Marks a factory as running until dropped.
struct Building<'a> {
    set: &'a Mutex<HashSet<(ThreadId, Id)>>,
    key: (ThreadId, Id),
}

impl Drop for Building<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that falls back to `container` for named ids.
    pub fn with_container(container: impl Container + 'static) -> Self {
        Self { container: Some(Box::new(container)), ..Self::default() }
    }

    /// Registers an instance. Replaces any previous entry under `id`.
    pub fn add<T: Any + Send + Sync>(&mut self, id: impl Into<Id>, value: T) -> Registration<'_> {
        self.add_arc(id, Arc::new(value))
    }

    /// Registers an already shared instance; `get` hands back clones of this `Arc`.
    pub fn add_arc<T: Any + Send + Sync>(&mut self, id: impl Into<Id>, value: Arc<T>) -> Registration<'_> {
        self.insert(id.into(), Kind::Value(value))
    }

    /// Registers a lazily invoked factory.
    pub fn add_factory<T, F>(&mut self, id: impl Into<Id>, factory: F) -> Registration<'_>
    where
        T: Any + Send + Sync,
        F: Fn(&Registry) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        let ctor: Constructor<T> = Arc::new(factory);
        let literal: Shared = Arc::new(Arc::clone(&ctor));
        let build: Build = Arc::new(move |registry| ctor(registry).map(|v| Arc::new(v) as Shared));
        self.insert(id.into(), Kind::Factory { build, literal })
    }

    /// Makes `id` resolve to whatever `target` resolves to.
    pub fn alias(&mut self, id: impl Into<Id>, target: impl Into<Id>) -> Registration<'_> {
        self.insert(id.into(), Kind::Alias(target.into()))
    }

    fn insert(&mut self, id: Id, kind: Kind) -> Registration<'_> {
        trace!(id = %id, "registry entry added");
        let entry = match self.entries.entry(id) {
            std::collections::hash_map::Entry::Occupied(mut o) => {
                o.insert(Entry::new(kind));
                o.into_mut()
            }
            std::collections::hash_map::Entry::Vacant(v) => v.insert(Entry::new(kind)),
        };
        Registration { entry }
    }

    /// Whether `id` resolves locally or through the backing container.
    pub fn has(&self, id: impl Into<Id>) -> bool {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return true;
        }
        match (&id, &self.container) {
            (Id::Name(name), Some(c)) => c.has(name),
            _ => false,
        }
    }

    /// Resolves `id` to a `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: impl Into<Id>) -> Result<Arc<T>, RegistryError> {
        let id = id.into();
        self.lookup(&id, 0)?
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch { id, expected: std::any::type_name::<T>() })
    }

    /// Resolves the entry registered under `T`'s own type id.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, RegistryError> {
        self.get::<T>(Id::of::<T>())
    }

    fn lookup(&self, id: &Id, depth: usize) -> Result<Shared, RegistryError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(RegistryError::AliasCycle(id.clone()));
        }

        let Some(entry) = self.entries.get(id) else {
            return self.fallback(id);
        };

        match &entry.kind {
            Kind::Value(value) => Ok(Arc::clone(value)),
            Kind::Alias(target) => self.lookup(target, depth + 1).map_err(|e| match e {
                RegistryError::AliasCycle(_) => RegistryError::AliasCycle(id.clone()),
                other => other,
            }),
            Kind::Factory { literal, .. } if entry.as_is => Ok(Arc::clone(literal)),
            Kind::Factory { build, .. } => {
                if let Some(value) = entry.cache.get() {
                    return Ok(Arc::clone(value));
                }
                let _building = self.enter(id)?;
                if entry.shared {
                    entry.cache.get_or_try_init(|| build(self)).map(Arc::clone)
                } else {
                    build(self)
                }
            }
        }
    }

    /// Fails if `id`'s factory is already running on this thread.
    fn enter(&self, id: &Id) -> Result<Building<'_>, RegistryError> {
        let key = (thread::current().id(), id.clone());
        if !self.building.lock().insert(key.clone()) {
            return Err(RegistryError::FactoryCycle(id.clone()));
        }
        Ok(Building { set: &self.building, key })
    }

    fn fallback(&self, id: &Id) -> Result<Shared, RegistryError> {
        match (id, &self.container) {
            (Id::Name(name), Some(container)) => {
                container.get(name).ok_or_else(|| RegistryError::NotFound(id.clone()))
            }
            _ => Err(RegistryError::NotFound(id.clone())),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.entries.keys().map(ToString::to_string).collect::<Vec<_>>())
            .field("container", &self.container.is_some())
            .finish()
    }
}

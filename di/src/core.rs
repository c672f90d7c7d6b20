//! Core data structures shared by every container flavour: service keys,
//! lifetimes, type-erased instances and the per-request resolution path.

use crate::error::ResolveError;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// The identity under which a service is registered and later requested.
///
/// A key is the `TypeId` of the service type plus an optional name, so the
/// same type can be registered several times under different names. The
/// type's name is kept for diagnostics only and does not take part in
/// equality or hashing.
#[derive(Clone)]
pub struct ServiceKey {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Arc<str>>,
}

impl ServiceKey {
  /// The unnamed key for `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: None,
    }
  }

  /// The key for `T` registered under `name`.
  pub fn named<T: ?Sized + Any>(name: &str) -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
      name: Some(Arc::from(name)),
    }
  }

  pub(crate) fn for_name<T: ?Sized + Any>(name: Option<&str>) -> Self {
    match name {
      Some(n) => Self::named::<T>(n),
      None => Self::of::<T>(),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl PartialEq for ServiceKey {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.type_id.hash(state);
    self.name.hash(state);
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}@{}", self.type_name, name),
      None => f.write_str(self.type_name),
    }
  }
}

impl fmt::Debug for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_name, name),
      None => write!(f, "Key({})", self.type_name),
    }
  }
}

/// How long a constructed instance is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Lifetime {
  /// One instance per container, created on first resolution.
  Singleton,
  /// One instance per [`Scope`](crate::Scope), created on first resolution
  /// within that scope.
  Scoped,
  /// A new instance on every resolution. The container keeps no reference.
  Transient,
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Lifetime::Singleton => "singleton",
      Lifetime::Scoped => "scoped",
      Lifetime::Transient => "transient",
    })
  }
}

/// A type-erased, resolved service.
///
/// Internally this is an `Arc<T>` boxed behind `dyn Any`, which lets trait
/// objects (`Arc<dyn Trait>`) travel through the container unchanged.
/// Cloning an `Instance` clones the handle, never the service.
#[derive(Clone)]
pub struct Instance {
  inner: Arc<dyn Any + Send + Sync>,
  type_name: &'static str,
}

impl Instance {
  pub(crate) fn new<T: ?Sized + Any + Send + Sync>(service: Arc<T>) -> Self {
    Self {
      inner: Arc::new(service),
      type_name: std::any::type_name::<T>(),
    }
  }

  /// Recovers the typed handle, or `None` if the instance holds another type.
  pub fn downcast<T: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.inner.downcast_ref::<Arc<T>>().cloned()
  }

  /// Like [`downcast`](Self::downcast), reporting a miss as an error about `key`.
  pub(crate) fn downcast_for<T: ?Sized + Any + Send + Sync>(
    &self,
    key: &ServiceKey,
  ) -> Result<Arc<T>, ResolveError> {
    self.downcast::<T>().ok_or_else(|| ResolveError::TypeMismatch {
      service: key.clone(),
      expected: std::any::type_name::<T>(),
    })
  }

  /// Whether both handles point at the very same constructed instance.
  pub fn ptr_eq(&self, other: &Instance) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Instance({})", self.type_name)
  }
}

/// The chain of services currently being resolved by one logical request.
///
/// Every container call starts a fresh path, so concurrent resolutions on
/// other threads never see each other's progress.
#[derive(Debug, Default)]
pub(crate) struct ResolutionPath {
  frames: Vec<(ServiceKey, Lifetime)>,
  // Shared instances this request put into a cache, in construction order.
  constructed: Vec<(ServiceKey, Lifetime)>,
}

impl ResolutionPath {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// The service whose dependencies are currently being resolved.
  pub(crate) fn current(&self) -> Option<&ServiceKey> {
    self.frames.last().map(|(key, _)| key)
  }

  /// The nearest singleton on the path, if any.
  pub(crate) fn singleton_owner(&self) -> Option<&ServiceKey> {
    self
      .frames
      .iter()
      .rev()
      .find(|(_, lifetime)| *lifetime == Lifetime::Singleton)
      .map(|(key, _)| key)
  }

  /// Records that this request filled the cache slot of `key`.
  pub(crate) fn record_constructed(&mut self, key: &ServiceKey, lifetime: Lifetime) {
    self.constructed.push((key.clone(), lifetime));
  }

  /// Drains the instances recorded by [`record_constructed`](Self::record_constructed).
  pub(crate) fn take_constructed(&mut self) -> Vec<(ServiceKey, Lifetime)> {
    std::mem::take(&mut self.constructed)
  }

  /// Pushes `key` onto the path, failing if it is already in progress.
  pub(crate) fn enter(
    &mut self,
    key: &ServiceKey,
    lifetime: Lifetime,
  ) -> Result<ResolutionGuard<'_>, ResolveError> {
    if let Some(start) = self.frames.iter().position(|(k, _)| k == key) {
      let mut cycle: Vec<ServiceKey> = self.frames[start..].iter().map(|(k, _)| k.clone()).collect();
      cycle.push(key.clone());
      return Err(ResolveError::CircularDependency { path: cycle });
    }
    self.frames.push((key.clone(), lifetime));
    Ok(ResolutionGuard { path: self })
  }
}

/// RAII guard returned by [`ResolutionPath::enter`]. Pops the frame on drop,
/// on the success path and on every early return alike.
pub(crate) struct ResolutionGuard<'a> {
  path: &'a mut ResolutionPath,
}

impl Deref for ResolutionGuard<'_> {
  type Target = ResolutionPath;

  fn deref(&self) -> &ResolutionPath {
    &*self.path
  }
}

impl DerefMut for ResolutionGuard<'_> {
  fn deref_mut(&mut self) -> &mut ResolutionPath {
    &mut *self.path
  }
}

impl Drop for ResolutionGuard<'_> {
  fn drop(&mut self) {
    self.path.frames.pop();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Alpha;
  struct Beta;

  #[test]
  fn keys_compare_by_type_and_name() {
    assert_eq!(ServiceKey::of::<Alpha>(), ServiceKey::of::<Alpha>());
    assert_ne!(ServiceKey::of::<Alpha>(), ServiceKey::of::<Beta>());
    assert_ne!(ServiceKey::of::<Alpha>(), ServiceKey::named::<Alpha>("a"));
    assert_eq!(ServiceKey::named::<Alpha>("a"), ServiceKey::for_name::<Alpha>(Some("a")));
  }

  #[test]
  fn key_display_includes_name() {
    let key = ServiceKey::named::<u32>("port");
    assert_eq!(key.to_string(), "u32@port");
    assert_eq!(ServiceKey::of::<u32>().to_string(), "u32");
  }

  #[test]
  fn guard_pops_on_drop() {
    let mut path = ResolutionPath::new();
    {
      let guard = path.enter(&ServiceKey::of::<Alpha>(), Lifetime::Transient).unwrap();
      assert_eq!(guard.current(), Some(&ServiceKey::of::<Alpha>()));
    }
    assert!(path.current().is_none());
  }

  #[test]
  fn reentering_reports_the_cycle_from_its_entry_point() {
    let a = ServiceKey::of::<Alpha>();
    let b = ServiceKey::of::<Beta>();
    let mut path = ResolutionPath::new();
    let mut outer = path.enter(&ServiceKey::of::<u8>(), Lifetime::Singleton).unwrap();
    let mut first = outer.enter(&a, Lifetime::Singleton).unwrap();
    let mut second = first.enter(&b, Lifetime::Transient).unwrap();

    match second.enter(&a, Lifetime::Singleton) {
      Err(ResolveError::CircularDependency { path }) => {
        assert_eq!(path, vec![a.clone(), b.clone(), a.clone()]);
      }
      _ => panic!("expected a circular dependency"),
    };
  }

  #[test]
  fn constructed_instances_outlive_their_frames() {
    let mut path = ResolutionPath::new();
    {
      let mut guard = path.enter(&ServiceKey::of::<Alpha>(), Lifetime::Singleton).unwrap();
      guard.record_constructed(&ServiceKey::of::<Beta>(), Lifetime::Scoped);
    }
    assert!(path.current().is_none());
    assert_eq!(
      path.take_constructed(),
      vec![(ServiceKey::of::<Beta>(), Lifetime::Scoped)]
    );
    assert!(path.take_constructed().is_empty());
  }

  #[test]
  fn singleton_owner_skips_transients() {
    let mut path = ResolutionPath::new();
    let mut root = path.enter(&ServiceKey::of::<Alpha>(), Lifetime::Singleton).unwrap();
    let inner = root.enter(&ServiceKey::of::<Beta>(), Lifetime::Transient).unwrap();
    assert_eq!(inner.singleton_owner(), Some(&ServiceKey::of::<Alpha>()));
  }

  #[test]
  fn instance_downcasts_to_its_own_type_only() {
    let instance = Instance::new(Arc::new(7_u32));
    assert_eq!(instance.downcast::<u32>().map(|v| *v), Some(7));
    assert!(instance.downcast::<u64>().is_none());
    assert!(instance.ptr_eq(&instance.clone()));
  }
}

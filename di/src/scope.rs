//! Scopes: short-lived resolution contexts, e.g. one per request.

use crate::container::Container;
use crate::core::{Instance, ServiceKey};
use crate::error::ResolveError;
use crate::resolver::{InstanceCache, Resolver};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A child resolution context of a [`Container`].
///
/// Within a scope, [`Lifetime::Scoped`](crate::Lifetime::Scoped) services
/// are constructed once and reused; another scope gets its own instances.
/// Singletons are shared with the container and with every other scope.
/// Dropping the scope releases its scoped instances.
///
/// # Examples
///
/// ```
/// use fibre_di::Container;
/// use std::sync::Arc;
///
/// struct RequestId(u64);
///
/// let container = Container::new();
/// container.add_scoped(|()| RequestId(7)).unwrap();
///
/// let scope = container.scope();
/// let a = scope.resolve::<RequestId>().unwrap();
/// let b = scope.resolve::<RequestId>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let other = container.scope();
/// assert!(!Arc::ptr_eq(&a, &other.resolve::<RequestId>().unwrap()));
/// ```
pub struct Scope<'c> {
  container: &'c Container,
  instances: InstanceCache,
}

impl fmt::Debug for Scope<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("container", &self.container.label())
      .field("instances", &self.instances.len())
      .finish()
  }
}

impl<'c> Scope<'c> {
  pub(crate) fn new(container: &'c Container) -> Self {
    tracing::trace!(container = container.label(), "scope opened");
    Self {
      container,
      instances: InstanceCache::new(),
    }
  }

  /// The container this scope resolves from.
  pub fn container(&self) -> &'c Container {
    self.container
  }

  fn resolver(&self) -> Resolver<'_> {
    self.container.resolver(Some(&self.instances))
  }

  pub fn resolve_key(&self, key: &ServiceKey) -> Result<Instance, ResolveError> {
    self.resolver().resolve(key)
  }

  pub fn try_get<T: ?Sized + Any + Send + Sync>(
    &self,
    name: Option<&str>,
  ) -> Result<Arc<T>, ResolveError> {
    let key = ServiceKey::for_name::<T>(name);
    self.resolve_key(&key)?.downcast_for::<T>(&key)
  }

  pub fn resolve<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
    self.try_get(None)
  }

  pub fn resolve_named<T: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
  ) -> Result<Arc<T>, ResolveError> {
    self.try_get(Some(name))
  }

  pub fn get<T: ?Sized + Any + Send + Sync>(&self, name: Option<&str>) -> Option<Arc<T>> {
    self.try_get(name).ok()
  }

  /// Whether `key` has a live instance in this scope, or a singleton in the
  /// container.
  pub fn is_cached(&self, key: &ServiceKey) -> bool {
    match self.container.registration(key) {
      Some(registration) => {
        self.instances.cached(&registration).is_some()
          || self.container.singletons().cached(&registration).is_some()
      }
      None => false,
    }
  }
}

impl Drop for Scope<'_> {
  fn drop(&mut self) {
    let released = self.instances.clear();
    tracing::trace!(container = self.container.label(), released, "scope closed");
  }
}

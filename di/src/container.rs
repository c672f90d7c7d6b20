//! The main `Container` struct and its associated methods.

use crate::builder::{ContainerBuilder, ContainerOptions};
use crate::core::{Instance, Lifetime, ServiceKey};
use crate::dependencies::{Dependencies, Resolved};
use crate::error::{RegistrationError, ResolveError};
use crate::registration::Registration;
use crate::registry::Registry;
use crate::resolver::{validate_graph, InstanceCache, Resolver};
use crate::scope::Scope;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The thread-safe dependency-injection container.
///
/// A container owns a [`Registry`] of recipes and the cache of singletons
/// built from them. Services may be registered at any time and in any order;
/// the dependency graph is only examined when something is resolved (or when
/// [`validate`](Self::validate) is called).
///
/// Typed registrations declare their dependencies as a tuple of `Arc`s. The
/// tuple's element types are the dependency keys, in order, and the factory
/// receives the resolved tuple:
///
/// ```
/// use fibre_di::Container;
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let container = Container::new();
/// container
///   .add_transient(|(config,): (Arc<Config>,)| Database { url: config.url.clone() })
///   .unwrap();
/// container.add_instance(Config { url: "sqlite::memory:".into() }).unwrap();
///
/// let db = container.resolve::<Database>().unwrap();
/// assert_eq!(db.url, "sqlite::memory:");
/// ```
///
/// Factories must not capture the container and resolve from it. A factory
/// that re-enters the container for a singleton whose construction is still
/// in progress blocks forever on that singleton's cell, and such edges are
/// invisible to cycle detection. Declare the dependency instead.
pub struct Container {
  registry: Registry,
  singletons: InstanceCache,
  label: Option<String>,
}

impl Default for Container {
  fn default() -> Self {
    Self::from_parts(Registry::new(), None)
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("label", &self.label)
      .field("registrations", &self.registry.len())
      .field("singletons", &self.singletons.len())
      .finish()
  }
}

impl Container {
  /// Creates a new, empty `Container` that overwrites on re-registration.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn builder() -> ContainerBuilder {
    ContainerBuilder::new()
  }

  pub fn with_options(options: ContainerOptions) -> Self {
    ContainerBuilder::from_options(options).build()
  }

  pub(crate) fn from_parts(registry: Registry, label: Option<String>) -> Self {
    Self {
      registry,
      singletons: InstanceCache::new(),
      label,
    }
  }

  pub fn label(&self) -> Option<&str> {
    self.label.as_deref()
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub(crate) fn resolver<'a>(&'a self, scoped: Option<&'a InstanceCache>) -> Resolver<'a> {
    Resolver::new(&self.registry, &self.singletons, scoped, self.label())
  }

  pub(crate) fn singletons(&self) -> &InstanceCache {
    &self.singletons
  }

  // --- PRIVATE HELPERS ---

  fn add_instance_internal<T: Any + Send + Sync>(
    &self,
    name: Option<&str>,
    instance: T,
  ) -> Result<(), RegistrationError> {
    let service = Arc::new(instance);
    self.register(
      Registration::singleton::<T>()
        .with_name(name)
        .factory_arc(move |_| Ok(Arc::clone(&service))),
    )
  }

  fn add_typed_internal<T, D>(
    &self,
    lifetime: Lifetime,
    name: Option<&str>,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError>
  where
    T: Any + Send + Sync,
    D: Dependencies,
  {
    self.register(
      Registration::builder::<T>(lifetime)
        .with_name(name)
        .inject::<D>()
        .factory(move |resolved| Ok(factory(D::from_resolved(resolved)?))),
    )
  }

  fn add_trait_internal<I, D>(
    &self,
    lifetime: Lifetime,
    name: Option<&str>,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError>
  where
    I: ?Sized + Any + Send + Sync,
    D: Dependencies,
  {
    self.register(
      Registration::builder::<I>(lifetime)
        .with_name(name)
        .inject::<D>()
        .factory_arc(move |resolved| Ok(factory(D::from_resolved(resolved)?))),
    )
  }

  // --- PUBLIC API ---

  /// Stores `registration`, subject to the container's
  /// [`ReRegistrationPolicy`](crate::ReRegistrationPolicy).
  ///
  /// Replacing a registration discards the singleton it may have produced.
  pub fn register(&self, registration: Registration) -> Result<(), RegistrationError> {
    let key = registration.key().clone();
    let lifetime = registration.lifetime();
    let replaced = self.registry.register(registration)?.is_some();
    if replaced {
      self.singletons.evict(&key);
    }
    tracing::debug!(container = self.label(), service = %key, %lifetime, replaced, "registered service");
    Ok(())
  }

  // --- Instance Registration ---
  pub fn add_instance<T: Any + Send + Sync>(&self, instance: T) -> Result<(), RegistrationError> {
    self.add_instance_internal(None, instance)
  }
  pub fn add_instance_with_name<T: Any + Send + Sync>(
    &self,
    name: &str,
    instance: T,
  ) -> Result<(), RegistrationError> {
    self.add_instance_internal(Some(name), instance)
  }

  // --- Singleton Registration ---
  /// Registers a singleton built by `factory` from the dependencies in `D`.
  ///
  /// The factory runs at most once, while the singleton's cell is locked. It
  /// receives everything it needs through `D` and must not resolve from the
  /// container itself.
  pub fn add_singleton<T: Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Singleton, None, factory)
  }
  pub fn add_singleton_with_name<T: Any + Send + Sync, D: Dependencies>(
    &self,
    name: &str,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Singleton, Some(name), factory)
  }

  // --- Scoped Registration ---
  pub fn add_scoped<T: Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Scoped, None, factory)
  }
  pub fn add_scoped_with_name<T: Any + Send + Sync, D: Dependencies>(
    &self,
    name: &str,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Scoped, Some(name), factory)
  }

  // --- Transient Registration ---
  pub fn add_transient<T: Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Transient, None, factory)
  }
  pub fn add_transient_with_name<T: Any + Send + Sync, D: Dependencies>(
    &self,
    name: &str,
    factory: impl Fn(D) -> T + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_typed_internal(Lifetime::Transient, Some(name), factory)
  }

  // --- Trait Registration ---
  pub fn add_singleton_trait<I: ?Sized + Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_trait_internal(Lifetime::Singleton, None, factory)
  }
  pub fn add_singleton_trait_with_name<I: ?Sized + Any + Send + Sync, D: Dependencies>(
    &self,
    name: &str,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_trait_internal(Lifetime::Singleton, Some(name), factory)
  }
  pub fn add_scoped_trait<I: ?Sized + Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_trait_internal(Lifetime::Scoped, None, factory)
  }
  pub fn add_transient_trait<I: ?Sized + Any + Send + Sync, D: Dependencies>(
    &self,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_trait_internal(Lifetime::Transient, None, factory)
  }
  pub fn add_transient_trait_with_name<I: ?Sized + Any + Send + Sync, D: Dependencies>(
    &self,
    name: &str,
    factory: impl Fn(D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_trait_internal(Lifetime::Transient, Some(name), factory)
  }

  // --- Decoration ---

  /// Wraps the current registration of `I` (optionally named) with
  /// `decorator`.
  ///
  /// The decorated service keeps the inner registration's lifetime. The
  /// decorator's own dependencies `D` are resolved after the inner
  /// service's. Decorators stack: decorating twice wraps the first decorator.
  ///
  /// # Examples
  ///
  /// ```
  /// use fibre_di::Container;
  /// use std::sync::Arc;
  ///
  /// trait Greeter: Send + Sync { fn greet(&self) -> String; }
  /// struct Plain;
  /// impl Greeter for Plain { fn greet(&self) -> String { "hi".into() } }
  /// struct Loud(Arc<dyn Greeter>);
  /// impl Greeter for Loud { fn greet(&self) -> String { self.0.greet().to_uppercase() } }
  ///
  /// let container = Container::new();
  /// container.add_singleton_trait::<dyn Greeter, _>(|()| Arc::new(Plain)).unwrap();
  /// container
  ///   .decorate::<dyn Greeter, _>(None, |inner, ()| Arc::new(Loud(inner)))
  ///   .unwrap();
  ///
  /// assert_eq!(container.resolve::<dyn Greeter>().unwrap().greet(), "HI");
  /// ```
  pub fn decorate<I, D>(
    &self,
    name: Option<&str>,
    decorator: impl Fn(Arc<I>, D) -> Arc<I> + Send + Sync + 'static,
  ) -> Result<(), RegistrationError>
  where
    I: ?Sized + Any + Send + Sync,
    D: Dependencies,
  {
    let key = ServiceKey::for_name::<I>(name);
    let inner = self
      .registry
      .get(&key)
      .ok_or_else(|| RegistrationError::NotRegistered(key.clone()))?;

    let split = inner.dependencies().len();
    let lifetime = inner.lifetime();
    let dependencies: Vec<ServiceKey> = inner
      .dependencies()
      .iter()
      .cloned()
      .chain(D::keys())
      .collect();

    let factory = move |resolved: &Resolved| -> Result<Instance, ResolveError> {
      let (own, extra) = resolved.split_at(split);
      let service = inner.construct(&own)?.downcast_for::<I>(own.owner())?;
      let extra = D::from_resolved(&extra)?;
      Ok(Instance::new(decorator(service, extra)))
    };

    self
      .registry
      .replace(Registration::from_parts(key.clone(), lifetime, dependencies, Arc::new(factory)));
    self.singletons.evict(&key);
    tracing::debug!(container = self.label(), service = %key, %lifetime, "decorated service");
    Ok(())
  }

  // --- Resolution ---

  /// Resolves `key` into a type-erased instance.
  pub fn resolve_key(&self, key: &ServiceKey) -> Result<Instance, ResolveError> {
    self.resolver(None).resolve(key)
  }

  /// Resolves `T`, registered under `name` or unnamed.
  pub fn try_get<T: ?Sized + Any + Send + Sync>(
    &self,
    name: Option<&str>,
  ) -> Result<Arc<T>, ResolveError> {
    let key = ServiceKey::for_name::<T>(name);
    self.resolve_key(&key)?.downcast_for::<T>(&key)
  }

  /// Resolves the unnamed registration of `T`.
  pub fn resolve<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
    self.try_get(None)
  }

  pub fn resolve_named<T: ?Sized + Any + Send + Sync>(
    &self,
    name: &str,
  ) -> Result<Arc<T>, ResolveError> {
    self.try_get(Some(name))
  }

  /// Resolves a service from the container, discarding the reason on failure.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self, name: Option<&str>) -> Option<Arc<T>> {
    self.try_get(name).ok()
  }

  // --- Introspection & lifecycle ---

  pub fn contains(&self, key: &ServiceKey) -> bool {
    self.registry.contains(key)
  }

  pub fn registration(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
    self.registry.get(key)
  }

  /// Whether a singleton for `key` has been constructed by its current
  /// registration.
  pub fn is_cached(&self, key: &ServiceKey) -> bool {
    self
      .registry
      .get(key)
      .is_some_and(|registration| self.singletons.cached(&registration).is_some())
  }

  pub fn len(&self) -> usize {
    self.registry.len()
  }

  pub fn is_empty(&self) -> bool {
    self.registry.is_empty()
  }

  /// Opens a scope. Scoped services resolved through it live as long as the
  /// returned [`Scope`].
  pub fn scope(&self) -> Scope<'_> {
    Scope::new(self)
  }

  /// Checks the whole dependency graph without constructing anything.
  ///
  /// Reports the first missing dependency, cycle or singleton-to-scoped
  /// dependency, visiting services in key order.
  pub fn validate(&self) -> Result<(), ResolveError> {
    validate_graph(&self.registry, self.registry.keys())
  }

  /// Releases every cached singleton. Registrations are kept, so later
  /// resolutions construct fresh singletons. Returns how many were released.
  pub fn dispose(&self) -> usize {
    let released = self.singletons.clear();
    tracing::debug!(container = self.label(), released, "disposed singletons");
    released
  }
}

// di/src/local_container.rs

//! A single-threaded, non-thread-safe dependency-injection container.

use crate::builder::ReRegistrationPolicy;
use crate::core::{Lifetime, ResolutionPath, ServiceKey};
use crate::error::{BoxError, RegistrationError, ResolveError};
use crate::resolver::{validate_graph, DependencyGraph, GraphCheck};
use once_cell::unsync::OnceCell;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// The single-threaded counterpart of [`Instance`](crate::Instance), built on `Rc`.
#[derive(Clone)]
pub struct LocalInstance {
  inner: Rc<dyn Any>,
  type_name: &'static str,
}

impl LocalInstance {
  fn new<T: ?Sized + Any>(service: Rc<T>) -> Self {
    Self {
      inner: Rc::new(service),
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn downcast<T: ?Sized + Any>(&self) -> Option<Rc<T>> {
    self.inner.downcast_ref::<Rc<T>>().cloned()
  }

  pub fn ptr_eq(&self, other: &LocalInstance) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

impl fmt::Debug for LocalInstance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "LocalInstance({})", self.type_name)
  }
}

/// The resolved dependencies of a local service, in declaration order.
#[derive(Debug, Clone)]
pub struct LocalResolved {
  owner: ServiceKey,
  instances: Vec<LocalInstance>,
}

impl LocalResolved {
  pub fn owner(&self) -> &ServiceKey {
    &self.owner
  }

  pub fn len(&self) -> usize {
    self.instances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instances.is_empty()
  }

  pub fn get<T: ?Sized + Any>(&self, index: usize) -> Result<Rc<T>, ResolveError> {
    self
      .instances
      .get(index)
      .and_then(LocalInstance::downcast::<T>)
      .ok_or_else(|| ResolveError::DependencyMismatch {
        service: self.owner.clone(),
        index,
        expected: std::any::type_name::<T>(),
      })
  }

  pub fn fail(&self, error: impl Into<BoxError>) -> ResolveError {
    let error: BoxError = error.into();
    ResolveError::Construction {
      service: self.owner.clone(),
      source: Arc::from(error),
    }
  }
}

/// An ordered dependency list of `Rc` handles known at compile time.
pub trait LocalDependencies: Sized + 'static {
  fn keys() -> Vec<ServiceKey>;

  fn from_resolved(resolved: &LocalResolved) -> Result<Self, ResolveError>;
}

impl LocalDependencies for () {
  fn keys() -> Vec<ServiceKey> {
    Vec::new()
  }

  fn from_resolved(_resolved: &LocalResolved) -> Result<Self, ResolveError> {
    Ok(())
  }
}

impl_dependency_tuples!(LocalDependencies, Rc, LocalResolved, ::std::any::Any);

type LocalFactory = dyn Fn(&LocalResolved) -> Result<LocalInstance, ResolveError>;

// A local version of a registration. Unlike the thread-safe container, the
// singleton cell lives next to the recipe: replacing the provider drops it.
struct LocalProvider {
  lifetime: Lifetime,
  dependencies: Vec<ServiceKey>,
  factory: Box<LocalFactory>,
  cell: OnceCell<LocalInstance>,
}

/// A single-threaded, non-thread-safe dependency-injection container.
///
/// It uses a standard `HashMap` for storage and `Rc` for shared ownership,
/// so it can hold services that are neither `Send` nor `Sync`. It supports
/// the singleton and transient lifetimes and reports the same errors as
/// [`Container`](crate::Container).
///
/// # Note on API
///
/// Unlike the thread-safe `Container`, registration methods like `add_singleton`
/// on `LocalContainer` require a mutable reference (`&mut self`) because `HashMap`
/// does not support interior mutability.
#[derive(Default)]
pub struct LocalContainer {
  providers: HashMap<ServiceKey, LocalProvider>,
  policy: ReRegistrationPolicy,
}

impl fmt::Debug for LocalContainer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LocalContainer")
      .field("registrations", &self.providers.len())
      .field("policy", &self.policy)
      .finish()
  }
}

impl DependencyGraph for LocalContainer {
  fn node(&self, key: &ServiceKey) -> Option<(Lifetime, Vec<ServiceKey>)> {
    self
      .providers
      .get(key)
      .map(|provider| (provider.lifetime, provider.dependencies.clone()))
  }

  fn is_settled(&self, key: &ServiceKey) -> bool {
    self
      .providers
      .get(key)
      .is_some_and(|provider| provider.cell.get().is_some())
  }
}

impl LocalContainer {
  /// Creates a new, empty `LocalContainer`.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_policy(policy: ReRegistrationPolicy) -> Self {
    Self {
      providers: HashMap::new(),
      policy,
    }
  }

  // --- PRIVATE HELPERS ---

  fn insert(&mut self, key: ServiceKey, provider: LocalProvider) -> Result<(), RegistrationError> {
    if self.policy == ReRegistrationPolicy::Reject && self.providers.contains_key(&key) {
      return Err(RegistrationError::AlreadyRegistered(key));
    }
    let lifetime = provider.lifetime;
    let replaced = self.providers.insert(key.clone(), provider).is_some();
    tracing::debug!(service = %key, %lifetime, replaced, "registered local service");
    Ok(())
  }

  fn add_provider_internal<I, D>(
    &mut self,
    lifetime: Lifetime,
    name: Option<&str>,
    factory: impl Fn(D) -> Rc<I> + 'static,
  ) -> Result<(), RegistrationError>
  where
    I: ?Sized + Any,
    D: LocalDependencies,
  {
    let provider = LocalProvider {
      lifetime,
      dependencies: D::keys(),
      factory: Box::new(move |resolved: &LocalResolved| -> Result<LocalInstance, ResolveError> {
        Ok(LocalInstance::new(factory(D::from_resolved(resolved)?)))
      }),
      cell: OnceCell::new(),
    };
    self.insert(ServiceKey::for_name::<I>(name), provider)
  }

  fn add_instance_internal<T: Any>(
    &mut self,
    name: Option<&str>,
    instance: T,
  ) -> Result<(), RegistrationError> {
    let service = Rc::new(instance);
    self.add_provider_internal(Lifetime::Singleton, name, move |()| Rc::clone(&service))
  }

  // --- PUBLIC API ---

  // --- Instance Registration ---
  pub fn add_instance<T: Any>(&mut self, instance: T) -> Result<(), RegistrationError> {
    self.add_instance_internal(None, instance)
  }

  pub fn add_instance_with_name<T: Any>(
    &mut self,
    name: &str,
    instance: T,
  ) -> Result<(), RegistrationError> {
    self.add_instance_internal(Some(name), instance)
  }

  // --- Singleton Registration ---
  pub fn add_singleton<T: Any, D: LocalDependencies>(
    &mut self,
    factory: impl Fn(D) -> T + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Singleton, None, move |deps: D| Rc::new(factory(deps)))
  }

  pub fn add_singleton_with_name<T: Any, D: LocalDependencies>(
    &mut self,
    name: &str,
    factory: impl Fn(D) -> T + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Singleton, Some(name), move |deps: D| Rc::new(factory(deps)))
  }

  // --- Transient Registration ---
  pub fn add_transient<T: Any, D: LocalDependencies>(
    &mut self,
    factory: impl Fn(D) -> T + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Transient, None, move |deps: D| Rc::new(factory(deps)))
  }

  pub fn add_transient_with_name<T: Any, D: LocalDependencies>(
    &mut self,
    name: &str,
    factory: impl Fn(D) -> T + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Transient, Some(name), move |deps: D| Rc::new(factory(deps)))
  }

  // --- Trait Registration ---
  pub fn add_singleton_trait<I: ?Sized + Any, D: LocalDependencies>(
    &mut self,
    factory: impl Fn(D) -> Rc<I> + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Singleton, None, factory)
  }

  pub fn add_singleton_trait_with_name<I: ?Sized + Any, D: LocalDependencies>(
    &mut self,
    name: &str,
    factory: impl Fn(D) -> Rc<I> + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Singleton, Some(name), factory)
  }

  pub fn add_transient_trait<I: ?Sized + Any, D: LocalDependencies>(
    &mut self,
    factory: impl Fn(D) -> Rc<I> + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Transient, None, factory)
  }
  pub fn add_transient_trait_with_name<I: ?Sized + Any, D: LocalDependencies>(
    &mut self,
    name: &str,
    factory: impl Fn(D) -> Rc<I> + 'static,
  ) -> Result<(), RegistrationError> {
    self.add_provider_internal(Lifetime::Transient, Some(name), factory)
  }

  // --- Resolution ---

  pub fn resolve_key(&self, key: &ServiceKey) -> Result<LocalInstance, ResolveError> {
    let result = GraphCheck::new(self, false)
      .check(key)
      .and_then(|()| self.resolve_in(key, &mut ResolutionPath::new()));
    if let Err(error) = &result {
      tracing::debug!(service = %key, %error, "local resolution failed");
    }
    result
  }

  fn resolve_in(&self, key: &ServiceKey, path: &mut ResolutionPath) -> Result<LocalInstance, ResolveError> {
    let requested_by = path.current().cloned();
    let provider = self
      .providers
      .get(key)
      .ok_or_else(|| ResolveError::NotRegistered {
        service: key.clone(),
        requested_by,
      })?;

    let mut guard = path.enter(key, provider.lifetime)?;
    match provider.lifetime {
      Lifetime::Singleton => {
        if let Some(instance) = provider.cell.get() {
          return Ok(instance.clone());
        }
        let resolved = self.dependencies(key, provider, &mut guard)?;
        let instance = provider.cell.get_or_try_init(|| (provider.factory)(&resolved))?;
        Ok(instance.clone())
      }
      Lifetime::Scoped => Err(ResolveError::ScopeRequired { service: key.clone() }),
      Lifetime::Transient => {
        let resolved = self.dependencies(key, provider, &mut guard)?;
        (provider.factory)(&resolved)
      }
    }
  }

  fn dependencies(
    &self,
    key: &ServiceKey,
    provider: &LocalProvider,
    path: &mut ResolutionPath,
  ) -> Result<LocalResolved, ResolveError> {
    let instances = provider
      .dependencies
      .iter()
      .map(|dependency| self.resolve_in(dependency, path))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(LocalResolved {
      owner: key.clone(),
      instances,
    })
  }

  /// Resolves `T`, registered under `name` or unnamed.
  pub fn try_get<T: ?Sized + Any>(&self, name: Option<&str>) -> Result<Rc<T>, ResolveError> {
    let key = ServiceKey::for_name::<T>(name);
    let instance = self.resolve_key(&key)?;
    instance.downcast::<T>().ok_or_else(|| ResolveError::TypeMismatch {
      service: key,
      expected: std::any::type_name::<T>(),
    })
  }

  pub fn resolve<T: ?Sized + Any>(&self) -> Result<Rc<T>, ResolveError> {
    self.try_get(None)
  }

  pub fn resolve_named<T: ?Sized + Any>(&self, name: &str) -> Result<Rc<T>, ResolveError> {
    self.try_get(Some(name))
  }

  /// Resolves a service from the container.
  ///
  /// Returns `None` if the service cannot be resolved; use
  /// [`try_get`](Self::try_get) to see why.
  pub fn get<T: ?Sized + Any>(&self, name: Option<&str>) -> Option<Rc<T>> {
    self.try_get(name).ok()
  }

  // --- Introspection & lifecycle ---

  pub fn contains(&self, key: &ServiceKey) -> bool {
    self.providers.contains_key(key)
  }

  pub fn is_cached(&self, key: &ServiceKey) -> bool {
    self.is_settled(key)
  }

  pub fn len(&self) -> usize {
    self.providers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.providers.is_empty()
  }

  /// Checks the whole dependency graph without constructing anything.
  pub fn validate(&self) -> Result<(), ResolveError> {
    validate_graph(self, self.providers.keys().cloned().collect())
  }

  /// Releases every cached singleton, keeping the registrations.
  pub fn dispose(&mut self) -> usize {
    let released = self
      .providers
      .values_mut()
      .filter_map(|provider| provider.cell.take())
      .count();
    tracing::debug!(released, "disposed local singletons");
    released
  }
}

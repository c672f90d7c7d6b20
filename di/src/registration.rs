//! Registrations: the stored recipe for producing instances of one service.

use crate::core::{Instance, Lifetime, ServiceKey};
use crate::dependencies::{Dependencies, Resolved};
use crate::error::ResolveError;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) type Factory = dyn Fn(&Resolved) -> Result<Instance, ResolveError> + Send + Sync;

/// An immutable recipe: key, ordered dependency keys, lifetime and factory.
///
/// Registrations are never mutated once built. Registering the same key again
/// replaces the stored `Registration` as a whole.
///
/// # Examples
///
/// ```
/// use fibre_di::{Container, Registration, ServiceKey};
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let container = Container::new();
/// container.register(
///   Registration::singleton::<Config>()
///     .named("primary")
///     .factory(|_| Ok(Config { url: "postgres://localhost".into() })),
/// ).unwrap();
/// container.register(
///   Registration::transient::<Database>()
///     .depends_on(ServiceKey::named::<Config>("primary"))
///     .factory(|deps| {
///       let config = deps.get::<Config>(0)?;
///       Ok(Database { url: config.url.clone() })
///     }),
/// ).unwrap();
///
/// assert_eq!(container.resolve::<Database>().unwrap().url, "postgres://localhost");
/// ```
pub struct Registration {
  key: ServiceKey,
  dependencies: Vec<ServiceKey>,
  lifetime: Lifetime,
  factory: Arc<Factory>,
}

impl Registration {
  /// Starts a registration for `T` with the given lifetime.
  pub fn builder<T: ?Sized + Any + Send + Sync>(lifetime: Lifetime) -> RegistrationBuilder<T> {
    RegistrationBuilder {
      key: ServiceKey::of::<T>(),
      lifetime,
      dependencies: Vec::new(),
      _marker: PhantomData,
    }
  }

  pub fn singleton<T: ?Sized + Any + Send + Sync>() -> RegistrationBuilder<T> {
    Self::builder(Lifetime::Singleton)
  }

  pub fn scoped<T: ?Sized + Any + Send + Sync>() -> RegistrationBuilder<T> {
    Self::builder(Lifetime::Scoped)
  }

  pub fn transient<T: ?Sized + Any + Send + Sync>() -> RegistrationBuilder<T> {
    Self::builder(Lifetime::Transient)
  }

  pub(crate) fn from_parts(
    key: ServiceKey,
    lifetime: Lifetime,
    dependencies: Vec<ServiceKey>,
    factory: Arc<Factory>,
  ) -> Self {
    Self {
      key,
      dependencies,
      lifetime,
      factory,
    }
  }

  pub fn key(&self) -> &ServiceKey {
    &self.key
  }

  /// The dependency keys, in the order the factory receives them.
  pub fn dependencies(&self) -> &[ServiceKey] {
    &self.dependencies
  }

  pub fn lifetime(&self) -> Lifetime {
    self.lifetime
  }

  pub(crate) fn construct(&self, resolved: &Resolved) -> Result<Instance, ResolveError> {
    (self.factory)(resolved)
  }
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("key", &self.key)
      .field("lifetime", &self.lifetime)
      .field("dependencies", &self.dependencies)
      .finish_non_exhaustive()
  }
}

/// Builds a [`Registration`] for `T`. `T` may be a trait object.
pub struct RegistrationBuilder<T: ?Sized> {
  key: ServiceKey,
  lifetime: Lifetime,
  dependencies: Vec<ServiceKey>,
  _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Any + Send + Sync> RegistrationBuilder<T> {
  /// Registers under `name` instead of the bare type.
  pub fn named(mut self, name: &str) -> Self {
    self.key = ServiceKey::named::<T>(name);
    self
  }

  pub(crate) fn with_name(mut self, name: Option<&str>) -> Self {
    self.key = ServiceKey::for_name::<T>(name);
    self
  }

  /// Appends one dependency. Its position is its index in [`Resolved`].
  pub fn depends_on(mut self, key: ServiceKey) -> Self {
    self.dependencies.push(key);
    self
  }

  /// Appends several dependencies, in iteration order.
  pub fn depends_on_all(mut self, keys: impl IntoIterator<Item = ServiceKey>) -> Self {
    self.dependencies.extend(keys);
    self
  }

  /// Appends the dependency keys of the tuple type `D`.
  pub fn inject<D: Dependencies>(self) -> Self {
    self.depends_on_all(D::keys())
  }

  /// Finishes with a factory that returns the service already behind an
  /// `Arc`. This is the form trait objects use.
  pub fn factory_arc<F>(self, factory: F) -> Registration
  where
    F: Fn(&Resolved) -> Result<Arc<T>, ResolveError> + Send + Sync + 'static,
  {
    let factory = move |resolved: &Resolved| factory(resolved).map(Instance::new);
    Registration::from_parts(self.key, self.lifetime, self.dependencies, Arc::new(factory))
  }
}

impl<T: Any + Send + Sync> RegistrationBuilder<T> {
  /// Finishes with a factory producing the service by value.
  pub fn factory<F>(self, factory: F) -> Registration
  where
    F: Fn(&Resolved) -> Result<T, ResolveError> + Send + Sync + 'static,
  {
    self.factory_arc(move |resolved| factory(resolved).map(Arc::new))
  }
}

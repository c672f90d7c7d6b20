use crate::core::ServiceKey;
use std::error::Error;
use std::sync::Arc;

/// The error type of a failed factory, as handed to [`Resolved::fail`](crate::Resolved::fail).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors that abort a resolution.
///
/// None of them are retried: they are a function of how the container was
/// configured. No partially built object graph is ever returned alongside one.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
  /// The service, or one of its dependencies, has no registration.
  #[error("service `{service}` is not registered{}", requested_by_suffix(.requested_by))]
  NotRegistered {
    service: ServiceKey,
    /// The service whose dependency list referenced the missing one.
    requested_by: Option<ServiceKey>,
  },

  /// The dependency graph loops back on itself.
  #[error("circular dependency detected: {}", display_path(.path))]
  CircularDependency {
    /// The cycle, from its entry point back to itself (`A -> B -> A`).
    path: Vec<ServiceKey>,
  },

  /// A singleton would capture a scoped service for the container's lifetime.
  #[error("singleton `{service}` cannot depend on scoped service `{dependency}`")]
  LifetimeMismatch {
    service: ServiceKey,
    dependency: ServiceKey,
  },

  /// A scoped service was requested outside of any scope.
  #[error("scoped service `{service}` can only be resolved from a scope")]
  ScopeRequired { service: ServiceKey },

  /// A factory asked for a dependency slot that does not exist or holds
  /// another type.
  #[error("factory of `{service}` expected `{expected}` at dependency position {index}")]
  DependencyMismatch {
    service: ServiceKey,
    index: usize,
    expected: &'static str,
  },

  /// The instance stored under the key is not of the requested type.
  #[error("service `{service}` does not hold a `{expected}`")]
  TypeMismatch {
    service: ServiceKey,
    expected: &'static str,
  },

  /// A fallible factory reported an error.
  #[error("failed to construct `{service}`: {source}")]
  Construction {
    service: ServiceKey,
    #[source]
    source: Arc<dyn Error + Send + Sync + 'static>,
  },
}

impl ResolveError {
  /// The service the error is about.
  pub fn service(&self) -> Option<&ServiceKey> {
    match self {
      ResolveError::NotRegistered { service, .. }
      | ResolveError::LifetimeMismatch { service, .. }
      | ResolveError::ScopeRequired { service }
      | ResolveError::DependencyMismatch { service, .. }
      | ResolveError::TypeMismatch { service, .. }
      | ResolveError::Construction { service, .. } => Some(service),
      ResolveError::CircularDependency { path } => path.first(),
    }
  }
}

/// Errors raised while registering services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
  /// The key is taken and the container rejects re-registration.
  #[error("service `{0}` is already registered")]
  AlreadyRegistered(ServiceKey),

  /// A decorator targeted a service that has no registration yet.
  #[error("cannot decorate `{0}`: it is not registered")]
  NotRegistered(ServiceKey),
}

fn requested_by_suffix(requested_by: &Option<ServiceKey>) -> String {
  match requested_by {
    Some(parent) => format!(" (required by `{parent}`)"),
    None => String::new(),
  }
}

fn display_path(path: &[ServiceKey]) -> String {
  path
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" -> ")
}

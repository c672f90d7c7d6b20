//! Positional dependency injection.
//!
//! A factory receives its dependencies as a [`Resolved`] list, in exactly the
//! order they were declared. The [`Dependencies`] trait derives that declared
//! order from a tuple type at compile time, so `(Arc<Database>, Arc<Logger>)`
//! means "resolve `Database`, then `Logger`, and hand them over in that order".

use crate::core::{Instance, ServiceKey};
use crate::error::{BoxError, ResolveError};
use std::any::Any;
use std::sync::Arc;

/// The resolved dependencies of one service, in declaration order.
#[derive(Debug, Clone)]
pub struct Resolved {
  owner: ServiceKey,
  instances: Vec<Instance>,
}

impl Resolved {
  pub(crate) fn new(owner: ServiceKey, instances: Vec<Instance>) -> Self {
    Self { owner, instances }
  }

  /// The service these dependencies are being resolved for.
  pub fn owner(&self) -> &ServiceKey {
    &self.owner
  }

  pub fn len(&self) -> usize {
    self.instances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instances.is_empty()
  }

  /// The dependency at `index`, typed.
  ///
  /// Fails with [`ResolveError::DependencyMismatch`] when the slot is out of
  /// range or holds a different type.
  pub fn get<T: ?Sized + Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ResolveError> {
    self
      .instances
      .get(index)
      .and_then(Instance::downcast::<T>)
      .ok_or_else(|| ResolveError::DependencyMismatch {
        service: self.owner.clone(),
        index,
        expected: std::any::type_name::<T>(),
      })
  }

  /// The untyped dependency at `index`.
  pub fn instance(&self, index: usize) -> Option<&Instance> {
    self.instances.get(index)
  }

  /// Wraps a factory failure into [`ResolveError::Construction`] for the owner.
  pub fn fail(&self, error: impl Into<BoxError>) -> ResolveError {
    let error: BoxError = error.into();
    ResolveError::Construction {
      service: self.owner.clone(),
      source: Arc::from(error),
    }
  }

  /// Splits the list at `mid`; both halves keep the same owner.
  pub(crate) fn split_at(&self, mid: usize) -> (Resolved, Resolved) {
    let mid = mid.min(self.instances.len());
    let (head, tail) = self.instances.split_at(mid);
    (
      Resolved::new(self.owner.clone(), head.to_vec()),
      Resolved::new(self.owner.clone(), tail.to_vec()),
    )
  }
}

/// Anything the thread-safe container can hand out behind an `Arc`,
/// trait objects included.
pub trait Injectable: Any + Send + Sync {}

impl<T: ?Sized + Any + Send + Sync> Injectable for T {}

/// An ordered dependency list known at compile time.
///
/// Implemented for `()` and for tuples of up to eight `Arc<T>` handles,
/// where `T` may be a trait object.
pub trait Dependencies: Sized + 'static {
  /// The keys to resolve, in order.
  fn keys() -> Vec<ServiceKey>;

  /// Builds the tuple from resolved instances.
  fn from_resolved(resolved: &Resolved) -> Result<Self, ResolveError>;
}

impl Dependencies for () {
  fn keys() -> Vec<ServiceKey> {
    Vec::new()
  }

  fn from_resolved(_resolved: &Resolved) -> Result<Self, ResolveError> {
    Ok(())
  }
}

// Generates a tuple impl of a dependency-list trait for one arity.
// `$ptr` is the smart pointer in each slot, `$bound` what its pointee must be.
macro_rules! impl_dependency_tuple {
  ($trait:ident, $ptr:ident, $resolved:ty, $bound:path; $($ty:ident => $idx:tt),+) => {
    impl<$($ty: ?Sized + $bound),+> $trait for ($($ptr<$ty>,)+) {
      fn keys() -> Vec<ServiceKey> {
        vec![$(ServiceKey::of::<$ty>()),+]
      }

      fn from_resolved(resolved: &$resolved) -> Result<Self, ResolveError> {
        Ok(($(resolved.get::<$ty>($idx)?,)+))
      }
    }
  };
}

macro_rules! impl_dependency_tuples {
  ($trait:ident, $ptr:ident, $resolved:ty, $bound:path) => {
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound; A => 0);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound; A => 0, B => 1);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound; A => 0, B => 1, C => 2);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound; A => 0, B => 1, C => 2, D => 3);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound;
      A => 0, B => 1, C => 2, D => 3, E => 4);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound;
      A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound;
      A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
    impl_dependency_tuple!($trait, $ptr, $resolved, $bound;
      A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);
  };
}

impl_dependency_tuples!(Dependencies, Arc, Resolved, Injectable);

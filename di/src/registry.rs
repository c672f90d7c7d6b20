//! The registry: a concurrent map from [`ServiceKey`] to [`Registration`].
//!
//! It holds data only. Nothing here looks at the shape of the dependency
//! graph, so services may be registered in any order, including before the
//! services they depend on.

use crate::builder::ReRegistrationPolicy;
use crate::core::ServiceKey;
use crate::error::{RegistrationError, ResolveError};
use crate::registration::Registration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Registry {
  entries: DashMap<ServiceKey, Arc<Registration>>,
  policy: ReRegistrationPolicy,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_policy(policy: ReRegistrationPolicy) -> Self {
    Self {
      entries: DashMap::new(),
      policy,
    }
  }

  pub fn policy(&self) -> ReRegistrationPolicy {
    self.policy
  }

  /// Inserts `registration`, returning the one it replaced.
  ///
  /// Under [`ReRegistrationPolicy::Reject`] an occupied key is left untouched
  /// and [`RegistrationError::AlreadyRegistered`] is returned.
  pub fn register(
    &self,
    registration: Registration,
  ) -> Result<Option<Arc<Registration>>, RegistrationError> {
    let key = registration.key().clone();
    match self.policy {
      ReRegistrationPolicy::Overwrite => Ok(self.entries.insert(key, Arc::new(registration))),
      ReRegistrationPolicy::Reject => match self.entries.entry(key) {
        Entry::Occupied(occupied) => Err(RegistrationError::AlreadyRegistered(occupied.key().clone())),
        Entry::Vacant(vacant) => {
          vacant.insert(Arc::new(registration));
          Ok(None)
        }
      },
    }
  }

  /// Replaces the registration regardless of policy. Used by decorators,
  /// which by definition wrap an existing entry.
  pub(crate) fn replace(&self, registration: Registration) -> Option<Arc<Registration>> {
    self
      .entries
      .insert(registration.key().clone(), Arc::new(registration))
  }

  /// The registration for `key`, or [`ResolveError::NotRegistered`].
  pub fn lookup(&self, key: &ServiceKey) -> Result<Arc<Registration>, ResolveError> {
    self.get(key).ok_or_else(|| ResolveError::NotRegistered {
      service: key.clone(),
      requested_by: None,
    })
  }

  pub fn get(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
    self.entries.get(key).map(|entry| Arc::clone(entry.value()))
  }

  pub fn contains(&self, key: &ServiceKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// A snapshot of the registered keys, in no particular order.
  pub fn keys(&self) -> Vec<ServiceKey> {
    self.entries.iter().map(|entry| entry.key().clone()).collect()
  }
}

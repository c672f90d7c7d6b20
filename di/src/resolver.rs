//! Resolution of a service key into an instance.
//!
//! Resolution runs in two passes over the dependency graph:
//!
//! 1. a *check* walks the subgraph reachable from the requested key, stopping
//!    at instances that are already cached, and reports missing services,
//!    cycles and captive lifetimes without running a single factory;
//! 2. a depth-first *construction* resolves each dependency in declaration
//!    order, invokes the factory and caches the result according to the
//!    service's lifetime.
//!
//! Both passes track the services in progress on a per-request
//! [`ResolutionPath`], never in shared state.

use crate::core::{Instance, Lifetime, ResolutionPath, ServiceKey};
use crate::dependencies::Resolved;
use crate::error::ResolveError;
use crate::registration::Registration;
use crate::registry::Registry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A cache slot remembers which registration produced it. A slot whose
/// registration has been replaced is stale and gets swapped out on the next
/// access.
struct CacheSlot {
  owner: Arc<Registration>,
  cell: OnceCell<Instance>,
}

impl CacheSlot {
  fn new(owner: &Arc<Registration>) -> Self {
    Self {
      owner: Arc::clone(owner),
      cell: OnceCell::new(),
    }
  }
}

/// Instances kept alive on behalf of a container (singletons) or a scope
/// (scoped services).
#[derive(Default)]
pub(crate) struct InstanceCache {
  slots: DashMap<ServiceKey, Arc<CacheSlot>>,
}

impl fmt::Debug for InstanceCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InstanceCache")
      .field("slots", &self.slots.len())
      .finish()
  }
}

impl InstanceCache {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  fn slot(&self, registration: &Arc<Registration>) -> Arc<CacheSlot> {
    let key = registration.key();
    if let Some(slot) = self.slots.get(key) {
      if Arc::ptr_eq(&slot.owner, registration) {
        return Arc::clone(slot.value());
      }
    }

    let mut entry = self
      .slots
      .entry(key.clone())
      .or_insert_with(|| Arc::new(CacheSlot::new(registration)));
    if !Arc::ptr_eq(&entry.owner, registration) {
      *entry = Arc::new(CacheSlot::new(registration));
    }
    Arc::clone(entry.value())
  }

  /// The cached instance produced by exactly this registration.
  pub(crate) fn cached(&self, registration: &Arc<Registration>) -> Option<Instance> {
    let slot = self.slots.get(registration.key())?;
    if !Arc::ptr_eq(&slot.owner, registration) {
      return None;
    }
    slot.cell.get().cloned()
  }

  pub(crate) fn evict(&self, key: &ServiceKey) -> bool {
    self.slots.remove(key).is_some()
  }

  /// Drops every cached instance, returning how many were constructed.
  pub(crate) fn clear(&self) -> usize {
    let released = self
      .slots
      .iter()
      .filter(|slot| slot.cell.get().is_some())
      .count();
    self.slots.clear();
    released
  }

  pub(crate) fn len(&self) -> usize {
    self
      .slots
      .iter()
      .filter(|slot| slot.cell.get().is_some())
      .count()
  }
}

/// The dependency graph as seen by [`GraphCheck`].
pub(crate) trait DependencyGraph {
  /// Lifetime and ordered dependencies of `key`, if registered.
  fn node(&self, key: &ServiceKey) -> Option<(Lifetime, Vec<ServiceKey>)>;

  /// Whether `key` already has a live instance, so its subgraph need not be
  /// walked again.
  fn is_settled(&self, _key: &ServiceKey) -> bool {
    false
  }
}

impl DependencyGraph for Registry {
  fn node(&self, key: &ServiceKey) -> Option<(Lifetime, Vec<ServiceKey>)> {
    self
      .get(key)
      .map(|registration| (registration.lifetime(), registration.dependencies().to_vec()))
  }
}

/// Walks a dependency graph looking for configuration errors.
pub(crate) struct GraphCheck<'g, G: ?Sized> {
  graph: &'g G,
  scope_available: bool,
  // (key, reached from a singleton) pairs already walked without error.
  checked: HashSet<(ServiceKey, bool)>,
}

impl<'g, G: DependencyGraph + ?Sized> GraphCheck<'g, G> {
  pub(crate) fn new(graph: &'g G, scope_available: bool) -> Self {
    Self {
      graph,
      scope_available,
      checked: HashSet::new(),
    }
  }

  pub(crate) fn check(&mut self, key: &ServiceKey) -> Result<(), ResolveError> {
    let mut path = ResolutionPath::new();
    self.visit(key, &mut path)
  }

  fn visit(&mut self, key: &ServiceKey, path: &mut ResolutionPath) -> Result<(), ResolveError> {
    let requested_by = path.current().cloned();
    let (lifetime, dependencies) =
      self
        .graph
        .node(key)
        .ok_or_else(|| ResolveError::NotRegistered {
          service: key.clone(),
          requested_by,
        })?;

    let mut guard = path.enter(key, lifetime)?;
    if lifetime == Lifetime::Scoped {
      if let Some(owner) = guard.singleton_owner() {
        return Err(ResolveError::LifetimeMismatch {
          service: owner.clone(),
          dependency: key.clone(),
        });
      }
      if !self.scope_available {
        return Err(ResolveError::ScopeRequired { service: key.clone() });
      }
    }

    let captive = guard.singleton_owner().is_some();
    if self.graph.is_settled(key) || !self.checked.insert((key.clone(), captive)) {
      return Ok(());
    }

    for dependency in &dependencies {
      self.visit(dependency, &mut guard)?;
    }
    Ok(())
  }
}

/// Checks every registered service, in key order, without constructing
/// anything. Scoped services are assumed to be resolved from a scope.
pub(crate) fn validate_graph<G: DependencyGraph + ?Sized>(
  graph: &G,
  mut keys: Vec<ServiceKey>,
) -> Result<(), ResolveError> {
  keys.sort_by_cached_key(ToString::to_string);
  let mut check = GraphCheck::new(graph, true);
  for key in &keys {
    check.check(key)?;
  }
  Ok(())
}

/// One resolution context: a registry, the container's singletons and, inside
/// a scope, the scope's instances.
pub(crate) struct Resolver<'a> {
  registry: &'a Registry,
  singletons: &'a InstanceCache,
  scoped: Option<&'a InstanceCache>,
  label: Option<&'a str>,
}

impl DependencyGraph for Resolver<'_> {
  fn node(&self, key: &ServiceKey) -> Option<(Lifetime, Vec<ServiceKey>)> {
    self.registry.node(key)
  }

  fn is_settled(&self, key: &ServiceKey) -> bool {
    let Some(registration) = self.registry.get(key) else {
      return false;
    };
    match registration.lifetime() {
      Lifetime::Singleton => self.singletons.cached(&registration).is_some(),
      Lifetime::Scoped => self
        .scoped
        .is_some_and(|cache| cache.cached(&registration).is_some()),
      Lifetime::Transient => false,
    }
  }
}

impl<'a> Resolver<'a> {
  pub(crate) fn new(
    registry: &'a Registry,
    singletons: &'a InstanceCache,
    scoped: Option<&'a InstanceCache>,
    label: Option<&'a str>,
  ) -> Self {
    Self {
      registry,
      singletons,
      scoped,
      label,
    }
  }

  /// Resolves `key`. On failure, every shared instance this call constructed
  /// is taken out of its cache again, so a failed resolution leaves the
  /// caches as it found them. Instances other callers constructed stay.
  pub(crate) fn resolve(&self, key: &ServiceKey) -> Result<Instance, ResolveError> {
    let mut path = ResolutionPath::new();
    let result = GraphCheck::new(self, self.scoped.is_some())
      .check(key)
      .and_then(|()| self.resolve_in(key, &mut path));
    if let Err(error) = &result {
      self.discard(path.take_constructed());
      tracing::debug!(container = self.label, service = %key, %error, "resolution failed");
    }
    result
  }

  fn discard(&self, constructed: Vec<(ServiceKey, Lifetime)>) {
    for (key, lifetime) in constructed {
      let cache = match lifetime {
        Lifetime::Singleton => Some(self.singletons),
        Lifetime::Scoped => self.scoped,
        Lifetime::Transient => None,
      };
      if cache.is_some_and(|cache| cache.evict(&key)) {
        tracing::debug!(
          container = self.label,
          service = %key,
          %lifetime,
          "discarded instance of failed resolution"
        );
      }
    }
  }

  fn resolve_in(&self, key: &ServiceKey, path: &mut ResolutionPath) -> Result<Instance, ResolveError> {
    let requested_by = path.current().cloned();
    let registration = self
      .registry
      .get(key)
      .ok_or_else(|| ResolveError::NotRegistered {
        service: key.clone(),
        requested_by,
      })?;

    let mut guard = path.enter(key, registration.lifetime())?;
    match registration.lifetime() {
      Lifetime::Singleton => self.shared(&registration, self.singletons, &mut guard),
      Lifetime::Scoped => {
        if let Some(owner) = guard.singleton_owner() {
          return Err(ResolveError::LifetimeMismatch {
            service: owner.clone(),
            dependency: key.clone(),
          });
        }
        let cache = self
          .scoped
          .ok_or_else(|| ResolveError::ScopeRequired { service: key.clone() })?;
        self.shared(&registration, cache, &mut guard)
      }
      Lifetime::Transient => {
        let resolved = self.dependencies(&registration, &mut guard)?;
        let instance = registration.construct(&resolved)?;
        tracing::trace!(container = self.label, service = %key, "constructed transient");
        Ok(instance)
      }
    }
  }

  /// Returns the cached instance or constructs it at most once, even under
  /// concurrent callers. Dependencies are resolved before the cell is
  /// locked, so only the factory itself runs inside the initialisation.
  fn shared(
    &self,
    registration: &Arc<Registration>,
    cache: &InstanceCache,
    path: &mut ResolutionPath,
  ) -> Result<Instance, ResolveError> {
    let slot = cache.slot(registration);
    if let Some(instance) = slot.cell.get() {
      tracing::trace!(container = self.label, service = %registration.key(), "cache hit");
      return Ok(instance.clone());
    }

    let resolved = self.dependencies(registration, path)?;
    let mut constructed = false;
    let instance = slot
      .cell
      .get_or_try_init(|| {
        let instance = registration.construct(&resolved)?;
        tracing::debug!(
          container = self.label,
          service = %registration.key(),
          lifetime = %registration.lifetime(),
          "constructed shared instance"
        );
        constructed = true;
        Ok::<_, ResolveError>(instance)
      })?
      .clone();
    // A concurrent caller may have won the race, in which case the instance
    // is not ours to discard.
    if constructed {
      path.record_constructed(registration.key(), registration.lifetime());
    }
    Ok(instance)
  }

  fn dependencies(
    &self,
    registration: &Registration,
    path: &mut ResolutionPath,
  ) -> Result<Resolved, ResolveError> {
    let instances = registration
      .dependencies()
      .iter()
      .map(|dependency| self.resolve_in(dependency, path))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Resolved::new(registration.key().clone(), instances))
  }
}

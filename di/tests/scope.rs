mod common;

use common::{init_tracing, request_graph, Handler, Session, Settings};
use fibre_di::{Container, ResolveError, ServiceKey};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

#[test]
fn test_scoped_instances_are_shared_within_a_scope() {
  init_tracing();
  let container = request_graph(Container::builder());

  let scope = container.scope();
  let h1 = scope.resolve::<Handler>().unwrap();
  let h2 = scope.resolve::<Handler>().unwrap();

  // Handlers are transient, the session they share is scoped.
  assert!(!Arc::ptr_eq(&h1, &h2));
  assert!(Arc::ptr_eq(&h1.session, &h2.session));
  assert_eq!(h1.session.settings.region, "eu-west");
}

#[test]
fn test_scopes_are_isolated_but_share_singletons() {
  init_tracing();
  let container = request_graph(Container::builder());

  let first = container.scope();
  let second = container.scope();
  let a = first.resolve::<Session>().unwrap();
  let b = second.resolve::<Session>().unwrap();

  assert!(!Arc::ptr_eq(&a, &b));
  assert!(Arc::ptr_eq(&a.settings, &b.settings));
  assert!(Arc::ptr_eq(
    &a.settings,
    &container.resolve::<Settings>().unwrap()
  ));
}

#[test]
fn test_scoped_service_outside_scope_is_an_error() {
  init_tracing();
  let container = request_graph(Container::builder());

  match container.resolve::<Handler>().unwrap_err() {
    ResolveError::ScopeRequired { service } => {
      assert_eq!(service, ServiceKey::of::<Session>());
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn test_singleton_depending_on_scoped_is_rejected() {
  init_tracing();
  #[derive(Debug)]
  struct Audit {
    _session: Arc<Session>,
  }

  let container = request_graph(Container::builder());
  container
    .add_singleton(|(session,): (Arc<Session>,)| Audit { _session: session })
    .unwrap();

  let scope = container.scope();
  match scope.resolve::<Audit>().unwrap_err() {
    ResolveError::LifetimeMismatch { service, dependency } => {
      assert_eq!(service, ServiceKey::of::<Audit>());
      assert_eq!(dependency, ServiceKey::of::<Session>());
    }
    other => panic!("unexpected error: {other}"),
  }
  // The scoped session was never built on the singleton's behalf.
  assert!(!scope.is_cached(&ServiceKey::of::<Session>()));
}

#[test]
fn test_dropping_a_scope_releases_its_instances() {
  init_tracing();
  static DROPPED: AtomicUsize = AtomicUsize::new(0);

  struct Transaction;
  impl Drop for Transaction {
    fn drop(&mut self) {
      DROPPED.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container.add_scoped(|()| Transaction).unwrap();

  {
    let scope = container.scope();
    let tx = scope.resolve::<Transaction>().unwrap();
    assert!(scope.is_cached(&ServiceKey::of::<Transaction>()));
    drop(tx);
    assert_eq!(DROPPED.load(Ordering::SeqCst), 0);
  }
  assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scoped_factory_runs_once_per_scope_under_concurrency() {
  init_tracing();
  static BUILT: AtomicUsize = AtomicUsize::new(0);

  struct Unit;

  let container = Container::new();
  container
    .add_scoped(|()| {
      BUILT.fetch_add(1, Ordering::SeqCst);
      thread::sleep(std::time::Duration::from_millis(20));
      Unit
    })
    .unwrap();

  let scope = container.scope();
  thread::scope(|s| {
    for _ in 0..8 {
      s.spawn(|| scope.resolve::<Unit>().unwrap());
    }
  });

  assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}

//! Broken graphs are reported as errors before anything is constructed.

use fibre_di::{Container, ResolveError, ServiceKey};
use std::sync::Arc;

struct Orders {
  _billing: Arc<Billing>,
}

struct Billing {
  _invoices: Arc<Invoices>,
}

struct Invoices {
  _orders: Arc<Orders>,
}

fn main() {
  let container = Container::new();
  container
    .add_singleton(|(billing,): (Arc<Billing>,)| Orders { _billing: billing })
    .expect("registration failed");
  container
    .add_transient(|(invoices,): (Arc<Invoices>,)| Billing { _invoices: invoices })
    .expect("registration failed");
  container
    .add_singleton(|(orders,): (Arc<Orders>,)| Invoices { _orders: orders })
    .expect("registration failed");

  // `validate` walks every registration without running a factory.
  match container.validate() {
    Err(err @ ResolveError::CircularDependency { .. }) => println!("validate: {err}"),
    other => panic!("expected a cycle, got {other:?}"),
  }

  // Resolving reports the same cycle, starting from where it closes.
  match container.resolve::<Orders>() {
    Err(ResolveError::CircularDependency { path }) => {
      let names: Vec<String> = path.iter().map(ToString::to_string).collect();
      println!("resolve: {}", names.join(" -> "));
      assert_eq!(path.len(), 4);
    }
    Err(other) => panic!("unexpected error: {other}"),
    Ok(_) => panic!("a cyclic graph must not resolve"),
  }

  // Nothing was built along the way.
  assert!(!container.is_cached(&ServiceKey::of::<Orders>()));
  assert!(!container.is_cached(&ServiceKey::of::<Invoices>()));
}

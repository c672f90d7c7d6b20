use fibre_di::{Container, ResolveError};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// --- Services ---

struct Settings {
  dsn: String,
}

// One connection per request.
struct Connection {
  id: usize,
  settings: Arc<Settings>,
}

// A new handler for every resolution, sharing the request's connection.
struct Handler {
  connection: Arc<Connection>,
}

// A singleton that would keep one request's connection alive forever.
struct ConnectionCache {
  _connection: Arc<Connection>,
}

static CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter("fibre_di=debug")
    .init();

  let container = Container::builder().label("scopes").build();
  container
    .add_instance(Settings {
      dsn: "postgres://localhost/app".to_string(),
    })
    .expect("registration failed");
  container
    .add_scoped(|(settings,): (Arc<Settings>,)| Connection {
      id: CONNECTIONS.fetch_add(1, Ordering::SeqCst),
      settings,
    })
    .expect("registration failed");
  container
    .add_transient(|(connection,): (Arc<Connection>,)| Handler { connection })
    .expect("registration failed");

  container.validate().expect("graph should be valid");

  for request in 0..2 {
    let scope = container.scope();
    let a = scope.resolve::<Handler>().expect("handler");
    let b = scope.resolve::<Handler>().expect("handler");
    assert!(Arc::ptr_eq(&a.connection, &b.connection));
    println!(
      "request {request}: connection #{} to {}",
      a.connection.id, a.connection.settings.dsn
    );
  }

  // Outside of a scope there is no connection to hand out.
  match container.resolve::<Handler>() {
    Err(err @ ResolveError::ScopeRequired { .. }) => println!("{err}"),
    other => panic!("unexpected result: {:?}", other.map(|_| ())),
  }

  // Captive dependencies are rejected before anything is built.
  container
    .add_singleton(|(connection,): (Arc<Connection>,)| ConnectionCache {
      _connection: connection,
    })
    .expect("registration failed");
  let err = container.validate().expect_err("singleton captures a scoped service");
  println!("{err}");
}

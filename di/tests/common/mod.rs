use fibre_di::{Container, ContainerBuilder};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Routes the container's tracing output through the test harness.
/// Set `RUST_LOG=fibre_di=trace` to see it.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

// A small request-handling graph shared by the scope and validation tests:
//
//   Handler (transient) -> Session (scoped) -> Settings (singleton)

#[derive(Debug)]
pub struct Settings {
  pub region: &'static str,
}

#[derive(Debug)]
pub struct Session {
  pub settings: Arc<Settings>,
}

#[derive(Debug)]
pub struct Handler {
  pub session: Arc<Session>,
}

pub fn request_graph(builder: ContainerBuilder) -> Container {
  let container = builder.build();
  container
    .add_instance(Settings { region: "eu-west" })
    .unwrap();
  container
    .add_scoped(|(settings,): (Arc<Settings>,)| Session { settings })
    .unwrap();
  container
    .add_transient(|(session,): (Arc<Session>,)| Handler { session })
    .unwrap();
  container
}

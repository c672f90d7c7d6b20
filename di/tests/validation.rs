mod common;

use common::{init_tracing, request_graph, Session};
use fibre_di::{
  Container, ContainerOptions, ReRegistrationPolicy, RegistrationError, ResolveError, ServiceKey,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_validate_accepts_a_sound_graph() {
  init_tracing();
  let container = request_graph(Container::builder());
  assert!(container.validate().is_ok());
  // Validation constructs nothing.
  assert!(!container.is_cached(&ServiceKey::of::<common::Settings>()));
}

#[test]
fn test_validate_reports_missing_dependency() {
  init_tracing();
  struct Mailer;
  struct Signup;

  let container = Container::new();
  container.add_transient(|(_,): (Arc<Mailer>,)| Signup).unwrap();

  match container.validate().unwrap_err() {
    ResolveError::NotRegistered { service, requested_by } => {
      assert_eq!(service, ServiceKey::of::<Mailer>());
      assert_eq!(requested_by, Some(ServiceKey::of::<Signup>()));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn test_validate_reports_captive_scoped_dependency() {
  init_tracing();
  struct Report;

  let container = request_graph(Container::builder());
  container.add_singleton(|(_,): (Arc<Session>,)| Report).unwrap();

  assert!(matches!(
    container.validate(),
    Err(ResolveError::LifetimeMismatch { ref service, .. }) if *service == ServiceKey::of::<Report>()
  ));
}

#[test]
fn test_validate_reports_cycle_through_named_services() {
  init_tracing();
  struct Node;

  let container = Container::new();
  container
    .register(
      fibre_di::Registration::transient::<Node>()
        .named("left")
        .depends_on(ServiceKey::named::<Node>("right"))
        .factory(|_| Ok(Node)),
    )
    .unwrap();
  container
    .register(
      fibre_di::Registration::transient::<Node>()
        .named("right")
        .depends_on(ServiceKey::named::<Node>("left"))
        .factory(|_| Ok(Node)),
    )
    .unwrap();

  let err = container.validate().unwrap_err();
  assert!(matches!(err, ResolveError::CircularDependency { ref path } if path.len() == 3));
  assert!(err.to_string().contains("@left"));
}

#[test]
fn test_reject_policy_keeps_the_first_registration() {
  init_tracing();
  let container = Container::builder().reject_re_registration().build();
  container.add_instance(String::from("first")).unwrap();

  let err = container.add_instance(String::from("second")).unwrap_err();
  assert_eq!(err, RegistrationError::AlreadyRegistered(ServiceKey::of::<String>()));
  assert_eq!(*container.resolve::<String>().unwrap(), "first");

  // Other names are still free.
  container
    .add_instance_with_name("other", String::from("other"))
    .unwrap();
}

#[test]
fn test_builder_options() {
  let container = Container::with_options(ContainerOptions {
    re_registration: ReRegistrationPolicy::Reject,
    label: Some("billing".to_string()),
  });
  assert_eq!(container.label(), Some("billing"));
  assert_eq!(container.registry().policy(), ReRegistrationPolicy::Reject);

  let default = Container::new();
  assert_eq!(default.label(), None);
  assert_eq!(default.registry().policy(), ReRegistrationPolicy::Overwrite);
}

#[test]
fn test_dependency_mismatch_from_hand_written_factory() {
  init_tracing();
  struct Wrong;

  let container = Container::new();
  container.add_instance(5_u16).unwrap();
  container
    .register(
      fibre_di::Registration::singleton::<Wrong>()
        .depends_on(ServiceKey::of::<u16>())
        .factory(|resolved| {
          // Asks for the wrong type at position 0.
          let _value = resolved.get::<u32>(0)?;
          Ok(Wrong)
        }),
    )
    .unwrap();

  assert!(matches!(
    container.resolve::<Wrong>(),
    Err(ResolveError::DependencyMismatch { index: 0, .. })
  ));
}

use fibre_di::{global, resolve, Container, ResolveError};
use std::panic;
use std::sync::Arc;

struct UnregisteredService;

struct Mailer;
struct SignupService {
  _mailer: Arc<Mailer>,
}

fn main() {
  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service that was never registered...");

  let result = panic::catch_unwind(|| {
    // This line will panic!
    let _service = resolve!(UnregisteredService);
  });

  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the non-panicking `get()` method ---
  println!("\nNow, attempting to resolve using the fallible `get()` method...");

  match global().get::<UnregisteredService>(None) {
    Some(_) => panic!("Should not have found the service!"),
    None => println!("Correctly received `None` for the missing service."),
  }

  // --- Finding out why ---
  // A missing *dependency* is reported together with the service that needs it.
  let container = Container::new();
  container
    .add_singleton(|(mailer,): (Arc<Mailer>,)| SignupService { _mailer: mailer })
    .expect("registration failed");

  match container.resolve::<SignupService>() {
    Err(err @ ResolveError::NotRegistered { .. }) => println!("\n{err}"),
    Err(other) => panic!("unexpected error: {other}"),
    Ok(_) => panic!("Should not have resolved the service!"),
  }

  // The same problem is visible up front, before anything is constructed.
  assert!(container.validate().is_err());
}

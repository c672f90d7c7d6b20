//! Named registrations of one trait, wired into consumers with explicit
//! dependency keys.

use fibre_di::{Container, Registration, ServiceKey};
use std::sync::Arc;

trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("email to {to}: '{message}'")
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("sms to {to}: '{message}'")
  }
}

// Sends through a primary channel and falls back to a secondary one.
struct Notifier {
  primary: Arc<dyn MessageSender>,
  fallback: Arc<dyn MessageSender>,
}

fn main() {
  let container = Container::new();
  container
    .add_singleton_trait_with_name::<dyn MessageSender, _>("email", |()| Arc::new(EmailSender))
    .expect("registration failed");
  container
    .add_singleton_trait_with_name::<dyn MessageSender, _>("sms", |()| Arc::new(SmsSender))
    .expect("registration failed");

  // Tuple dependencies name bare types, so named dependencies are declared
  // on the builder. Position 0 is the primary channel, position 1 the fallback.
  for (name, primary, fallback) in [("alerts", "sms", "email"), ("digest", "email", "sms")] {
    container
      .register(
        Registration::singleton::<Notifier>()
          .named(name)
          .depends_on(ServiceKey::named::<dyn MessageSender>(primary))
          .depends_on(ServiceKey::named::<dyn MessageSender>(fallback))
          .factory(|resolved| {
            Ok(Notifier {
              primary: resolved.get::<dyn MessageSender>(0)?,
              fallback: resolved.get::<dyn MessageSender>(1)?,
            })
          }),
      )
      .expect("registration failed");
  }

  let alerts = container.resolve_named::<Notifier>("alerts").expect("alerts");
  let digest = container.resolve_named::<Notifier>("digest").expect("digest");

  println!("{}", alerts.primary.send("+123456789", "disk almost full"));
  println!("{}", digest.primary.send("ops@example.com", "weekly summary"));
  println!("{}", digest.fallback.send("+123456789", "weekly summary"));

  assert!(alerts.primary.send("a", "b").starts_with("sms"));
  assert!(digest.primary.send("a", "b").starts_with("email"));
  // Both notifiers share the same named singletons.
  assert!(Arc::ptr_eq(&alerts.primary, &digest.fallback));
}

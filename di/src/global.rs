//! The process-wide container and its accessor.

use crate::container::Container;
use once_cell::sync::Lazy;

// Created on first access, in a thread-safe manner. Lives for the rest of
// the process.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(|| Container::builder().label("global").build());

/// Provides a reference to the global container instance.
///
/// Prefer passing a `&Container` around where possible; tests can then build
/// isolated containers with [`Container::new`]. The global container exists
/// for applications that want one well-known registry.
///
/// # Examples
///
/// ```
/// use fibre_di::global;
///
/// fn register_services() {
///   global()
///     .add_instance_with_name("greeting", String::from("Hello from global!"))
///     .unwrap();
/// }
/// # register_services();
/// ```
pub fn global() -> &'static Container {
  &GLOBAL_CONTAINER
}

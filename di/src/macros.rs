//! Public macros for ergonomic service resolution.

/// Resolves a service from the global container.
///
/// It panics if the requested service cannot be resolved, printing the
/// resolution error. Use [`maybe_resolve!`] or `global().resolve::<T>()` to
/// handle failures instead.
///
/// # Panics
///
/// This macro will panic if the service cannot be resolved.
///
/// # Examples
///
/// ```
/// use fibre_di::{global, resolve};
/// use std::sync::Arc;
///
/// global().add_singleton_with_name("doc_greeting", |()| String::from("hello")).unwrap();
///
/// let message = resolve!(String, "doc_greeting");
/// assert_eq!(*message, "hello");
/// ```
///
/// ```
/// use fibre_di::{global, resolve};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// global().add_singleton_trait::<dyn Greeter, _>(|()| Arc::new(EnglishGreeter)).unwrap();
///
/// let greeter = resolve!(trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
  (trait $trait_ident:ident) => {
    $crate::resolve_from!($crate::global(), trait $trait_ident)
  };
  (trait $trait_ident:ident, $name:expr) => {
    $crate::resolve_from!($crate::global(), trait $trait_ident, $name)
  };
  ($type:ty) => {
    $crate::resolve_from!($crate::global(), $type)
  };
  ($type:ty, $name:expr) => {
    $crate::resolve_from!($crate::global(), $type, $name)
  };
}

/// Like [`resolve!`], but yields an `Option` instead of panicking.
#[macro_export]
macro_rules! maybe_resolve {
  (trait $trait_ident:ident) => {
    $crate::maybe_resolve_from!($crate::global(), trait $trait_ident)
  };
  (trait $trait_ident:ident, $name:expr) => {
    $crate::maybe_resolve_from!($crate::global(), trait $trait_ident, $name)
  };
  ($type:ty) => {
    $crate::maybe_resolve_from!($crate::global(), $type)
  };
  ($type:ty, $name:expr) => {
    $crate::maybe_resolve_from!($crate::global(), $type, $name)
  };
}

/// Resolves a service from the given container, scope or local container,
/// panicking with the resolution error on failure.
///
/// # Examples
///
/// ```
/// use fibre_di::{resolve_from, Container};
///
/// let container = Container::new();
/// container.add_instance(42_u32).unwrap();
/// assert_eq!(*resolve_from!(&container, u32), 42);
/// ```
#[macro_export]
macro_rules! resolve_from {
  ($container:expr, trait $trait_ident:ident) => {
    $container
      .try_get::<dyn $trait_ident>(None)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service: {}: {}",
          ::std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };
  ($container:expr, trait $trait_ident:ident, $name:expr) => {
    $container
      .try_get::<dyn $trait_ident>(Some($name))
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service with name '{}': {}: {}",
          $name,
          ::std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };
  ($container:expr, $type:ty) => {
    $container.try_get::<$type>(None).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service: {}: {}",
        ::std::any::type_name::<$type>(),
        err
      )
    })
  };
  ($container:expr, $type:ty, $name:expr) => {
    $container.try_get::<$type>(Some($name)).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service with name '{}': {}: {}",
        $name,
        ::std::any::type_name::<$type>(),
        err
      )
    })
  };
}

/// Like [`resolve_from!`], but yields an `Option` instead of panicking.
#[macro_export]
macro_rules! maybe_resolve_from {
  ($container:expr, trait $trait_ident:ident) => {
    $container.get::<dyn $trait_ident>(None)
  };
  ($container:expr, trait $trait_ident:ident, $name:expr) => {
    $container.get::<dyn $trait_ident>(Some($name))
  };
  ($container:expr, $type:ty) => {
    $container.get::<$type>(None)
  };
  ($container:expr, $type:ty, $name:expr) => {
    $container.get::<$type>(Some($name))
  };
}

//! # Fibre DI
//!
//! A thread-safe dependency-injection container with explicit dependency
//! graphs, lifetimes and early detection of broken configurations.
//!
//! Every registration declares the services it depends on, in order. The
//! container resolves those dependencies first and hands them to the factory
//! positionally, so factories never reach back into the container. Because
//! the graph is declared, it can be checked before anything is built: missing
//! services, cycles and singletons capturing scoped services are reported as
//! errors, never as panics, deadlocks or stack overflows.
//!
//! ## Core Concepts
//!
//! - **Container**: the registry of recipes plus the cache of singletons.
//! - **Lifetimes**: `Singleton` (one per container), `Scoped` (one per
//!   [`Scope`]) and `Transient` (new on every resolution).
//! - **Dependencies**: a tuple of `Arc`s such as `(Arc<Config>, Arc<dyn Log>)`
//!   is both the declared dependency list and the factory's argument.
//! - **Global Container**: an optional process-wide container, accessible via
//!   [`global()`], with the [`resolve!`] family of macros.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{Container, ResolveError};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!   fn log(&self, line: &str) -> String;
//! }
//!
//! struct StdoutLogger;
//! impl Logger for StdoutLogger {
//!   fn log(&self, line: &str) -> String {
//!     format!("[app] {line}")
//!   }
//! }
//!
//! struct Database {
//!   logger: Arc<dyn Logger>,
//! }
//!
//! struct Service {
//!   db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container.add_transient_trait::<dyn Logger, _>(|()| Arc::new(StdoutLogger)).unwrap();
//! container
//!   .add_singleton(|(logger,): (Arc<dyn Logger>,)| Database { logger })
//!   .unwrap();
//! container
//!   .add_transient(|(db,): (Arc<Database>,)| Service { db })
//!   .unwrap();
//!
//! let first = container.resolve::<Service>().unwrap();
//! let second = container.resolve::<Service>().unwrap();
//! assert!(Arc::ptr_eq(&first.db, &second.db));
//! assert_eq!(first.db.logger.log("ready"), "[app] ready");
//!
//! struct Missing;
//! assert!(matches!(
//!   container.resolve::<Missing>(),
//!   Err(ResolveError::NotRegistered { .. })
//! ));
//! ```

#[macro_use]
mod dependencies;

mod builder;
mod container;
mod core;
mod error;
mod global;
#[cfg(feature = "local")]
mod local_container;
mod macros;
mod registration;
mod registry;
mod resolver;
mod scope;

pub use crate::builder::{ContainerBuilder, ContainerOptions, ReRegistrationPolicy};
pub use crate::container::Container;
pub use crate::core::{Instance, Lifetime, ServiceKey};
pub use crate::dependencies::{Dependencies, Injectable, Resolved};
pub use crate::error::{BoxError, RegistrationError, ResolveError};
pub use crate::global::global;
#[cfg(feature = "local")]
pub use crate::local_container::{LocalContainer, LocalDependencies, LocalInstance, LocalResolved};
pub use crate::registration::{Registration, RegistrationBuilder};
pub use crate::registry::Registry;
pub use crate::scope::Scope;

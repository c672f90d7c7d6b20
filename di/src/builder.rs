use crate::container::Container;
use crate::registry::Registry;
use std::fmt;

/// What happens when a key that already has a registration is registered
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReRegistrationPolicy {
  /// The last registration wins. A cached singleton of the replaced
  /// registration is discarded, so the next resolution uses the new factory.
  #[default]
  Overwrite,
  /// The first registration wins; later attempts fail with
  /// [`RegistrationError::AlreadyRegistered`](crate::RegistrationError::AlreadyRegistered).
  Reject,
}

/// Plain configuration of a [`Container`].
///
/// With the `serde` feature enabled this can be embedded in an application's
/// own configuration file. Service definitions are never read from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerOptions {
  pub re_registration: ReRegistrationPolicy,
  /// Attached as the `container` field to every log event.
  pub label: Option<String>,
}

/// A builder for [`Container`] instances.
///
/// # Examples
///
/// ```
/// use fibre_di::{Container, ReRegistrationPolicy};
///
/// let container = Container::builder()
///   .re_registration(ReRegistrationPolicy::Reject)
///   .label("billing")
///   .build();
///
/// container.add_instance(5_u32).unwrap();
/// assert!(container.add_instance(6_u32).is_err());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
  options: ContainerOptions,
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("re_registration", &self.options.re_registration)
      .field("label", &self.options.label)
      .finish()
  }
}

impl ContainerBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from existing options.
  pub fn from_options(options: ContainerOptions) -> Self {
    Self { options }
  }

  /// Sets the re-registration policy. Defaults to
  /// [`ReRegistrationPolicy::Overwrite`].
  pub fn re_registration(mut self, policy: ReRegistrationPolicy) -> Self {
    self.options.re_registration = policy;
    self
  }

  /// Shorthand for `re_registration(ReRegistrationPolicy::Reject)`.
  pub fn reject_re_registration(self) -> Self {
    self.re_registration(ReRegistrationPolicy::Reject)
  }

  /// Names the container in log events.
  pub fn label(mut self, label: impl Into<String>) -> Self {
    self.options.label = Some(label.into());
    self
  }

  pub fn build(self) -> Container {
    let registry = Registry::with_policy(self.options.re_registration);
    Container::from_parts(registry, self.options.label)
  }
}

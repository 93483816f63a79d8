//! Builder for configuring a Registry.

use crate::convert::ConversionPolicy;
use crate::registry::Registry;

/// Builder for configuring a [`Registry`].
///
/// # Example
///
/// ```
/// use callreg::{ConversionPolicy, Registry};
///
/// let registry = Registry::builder()
///     .namespace("com.example.device")
///     .conversion_policy(ConversionPolicy::Exact)
///     .build();
///
/// assert_eq!(registry.namespace(), Some("com.example.device"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    namespace: Option<String>,
    policy: ConversionPolicy,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every qualified name with `namespace`.
    ///
    /// An empty string means no namespace.
    ///
    /// Default: none
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    /// Set which argument conversions `call` applies.
    ///
    /// Default: [`ConversionPolicy::Lenient`]
    pub fn conversion_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Registry {
        Registry::from_parts(self.namespace, self.policy)
    }
}

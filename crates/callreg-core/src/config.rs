//! Centralized configuration for callreg.
//!
//! Naming rules and adapter limits shared by the registry and method sets.

/// Registry-level configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Joins namespace, type name and method name into a qualified name.
    pub const NAMESPACE_SEPARATOR: char = '.';

    /// Highest parameter count a method adapter supports (receiver excluded).
    pub const MAX_ARITY: usize = 6;

    /// Characters that would make a qualified name or signature ambiguous.
    pub const RESERVED_NAME_CHARS: &'static [char] = &['.', '(', ')', ','];
}

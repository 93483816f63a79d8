//! callreg - register objects' exported methods and call them by name.
//!
//! A type lists its methods once (see [`Exported`]); registering a shared
//! instance of it makes every exported method callable through a string key of
//! the form `[namespace.]TypeName.MethodName`. Arguments are passed as generic
//! [`Value`]s, checked against the declared parameter types, converted where the
//! [`ConversionPolicy`] allows, and the method's results come back as values.
//!
//! # Example
//!
//! ```
//! use callreg::{args, shared, Exported, MethodSet, Registry, Value};
//!
//! #[derive(Default)]
//! struct Service {
//!     running: bool,
//! }
//!
//! impl Service {
//!     fn run(&mut self) {
//!         self.running = true;
//!     }
//!
//!     fn running(&self) -> bool {
//!         self.running
//!     }
//! }
//!
//! impl Exported for Service {
//!     fn type_name() -> &'static str {
//!         "service"
//!     }
//!
//!     fn export(methods: &mut MethodSet<Self>) {
//!         methods
//!             .method("Run", Service::run)
//!             .method("Running", Service::running);
//!     }
//! }
//!
//! fn main() -> callreg::Result<()> {
//!     let service = shared(Service::default());
//!     let registry = Registry::new();
//!     registry.register(&[&service])?;
//!
//!     registry.call("service.Run", args![])?;
//!     assert_eq!(registry.call("service.Running", args![])?, vec![Value::Bool(true)]);
//!     assert!(service.lock().unwrap().running);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod json;
pub mod method;
pub mod registry;
pub mod value;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use convert::{convert, ConversionError, ConversionPolicy};
pub use error::{CallregError, Result};
pub use json::params_to_args;
pub use method::{
    short_type_name, shared, BoundMethod, Exported, Method, MethodDecl, MethodSet, Registrable,
    Ret, Shared, Visibility,
};
pub use registry::{
    qualified_name, signature, MethodEntry, MethodInfo, Registry, RegistryBuilder,
};
pub use value::{Typed, Value, ValueType};

/// Build a `Vec<Value>` argument list from anything convertible into [`Value`].
///
/// ```
/// use callreg::{args, Value};
///
/// assert_eq!(args![1i32, "two"], vec![Value::I32(1), Value::from("two")]);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}

//! The method registry: qualified name → bound method.
//!
//! Receivers are registered once; each exported method becomes a
//! [`MethodEntry`] keyed by `[namespace.]TypeName.MethodName`. Calls look the
//! entry up by that string, match the supplied arguments against the declared
//! parameter types, and invoke the method on the registered receiver.
//!
//! # Locking
//!
//! One `Mutex` guards the whole name → entry map. Entries are immutable and
//! reference counted, so `call` holds the lock only for the lookup and runs the
//! method after releasing it. A registered method may therefore call back into
//! the same registry.
//!
//! # Example
//!
//! ```
//! use callreg::{args, shared, Exported, MethodSet, Registry, Value};
//!
//! struct Monitor;
//!
//! impl Monitor {
//!     fn display(&self) -> String {
//!         "Display()".to_string()
//!     }
//! }
//!
//! impl Exported for Monitor {
//!     fn type_name() -> &'static str {
//!         "monitor"
//!     }
//!
//!     fn export(methods: &mut MethodSet<Self>) {
//!         methods.method("Display", Monitor::display);
//!     }
//! }
//!
//! let registry = Registry::with_namespace("com.example.device");
//! registry.register(&[&shared(Monitor)]).unwrap();
//!
//! let out = registry.call("com.example.device.monitor.Display", args![]).unwrap();
//! assert_eq!(out, vec![Value::from("Display()")]);
//! ```

mod builder;
mod entry;

pub use builder::RegistryBuilder;
pub use entry::{qualified_name, signature, MethodEntry, MethodInfo};

use crate::config::RegistryConfig;
use crate::convert::ConversionPolicy;
use crate::error::{CallregError, Result};
use crate::method::Registrable;
use crate::value::Value;
use entry::validate_segment;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Registry of callable methods keyed by qualified name.
pub struct Registry {
    namespace: Option<String>,
    policy: ConversionPolicy,
    methods: Mutex<HashMap<String, Arc<MethodEntry>>>,
}

impl Registry {
    /// Create an empty registry with no namespace.
    pub fn new() -> Self {
        Self::from_parts(None, ConversionPolicy::default())
    }

    /// Create an empty registry whose qualified names start with `namespace`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        RegistryBuilder::new().namespace(namespace).build()
    }

    /// Start configuring a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub(crate) fn from_parts(namespace: Option<String>, policy: ConversionPolicy) -> Self {
        Self {
            namespace,
            policy,
            methods: Mutex::new(HashMap::new()),
        }
    }

    /// Namespace prefix, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Conversion policy applied to call arguments.
    pub fn conversion_policy(&self) -> ConversionPolicy {
        self.policy
    }

    fn lock_methods(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<MethodEntry>>>> {
        self.methods.lock().map_err(|_| CallregError::LockPoisoned)
    }

    // ========================================
    // Registration
    // ========================================

    /// Register every exported method of each instance.
    ///
    /// Existing entries with the same qualified name are replaced. The namespace,
    /// type and method names are validated before anything is stored, so an
    /// invalid name leaves the registry unchanged. Returns the number of methods
    /// stored.
    pub fn register(&self, instances: &[&dyn Registrable]) -> Result<usize> {
        if let Some(namespace) = self.namespace() {
            for segment in namespace.split(RegistryConfig::NAMESPACE_SEPARATOR) {
                validate_segment("namespace", segment).map_err(|_| CallregError::InvalidName {
                    kind: "namespace",
                    name: namespace.to_string(),
                })?;
            }
        }

        let mut entries = Vec::new();
        for instance in instances {
            let type_name = instance.type_name();
            validate_segment("type", type_name)?;

            for method in instance.bind() {
                validate_segment("method", method.name())?;
                let name = qualified_name(self.namespace(), type_name, method.name());
                entries.push(MethodEntry::new(name, method));
            }
        }

        let count = entries.len();
        let mut methods = self.lock_methods()?;
        for entry in entries {
            debug!("Registered {}", entry.signature());
            if let Some(previous) = methods.insert(entry.name().to_string(), Arc::new(entry)) {
                warn!("Replaced existing registration: {}", previous.signature());
            }
        }

        Ok(count)
    }

    /// Register a single instance.
    pub fn register_one<R: Registrable>(&self, instance: &R) -> Result<usize> {
        self.register(&[instance])
    }

    // ========================================
    // Invocation
    // ========================================

    /// Call a registered method by qualified name.
    ///
    /// Arguments whose type differs from the declared parameter type are
    /// converted according to the registry's [`ConversionPolicy`]. Any lookup or
    /// matching failure is returned before the method runs. Returns the method's
    /// return values in declaration order, or an empty vector if it has none.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        let entry = self.lookup(name).map_err(|e| {
            warn!("Rejected call: {}", e);
            e
        })?;

        let args = entry.match_arguments(args, self.policy).map_err(|e| {
            warn!("Rejected call to {}: {}", name, e);
            e
        })?;

        entry.invoke(args)
    }

    fn lookup(&self, name: &str) -> Result<Arc<MethodEntry>> {
        let methods = self.lock_methods()?;
        methods
            .get(name)
            .cloned()
            .ok_or_else(|| CallregError::MethodNotFound {
                name: name.to_string(),
            })
    }

    // ========================================
    // Introspection
    // ========================================

    /// Signature strings of every registered method, in no particular order.
    pub fn dump(&self) -> Result<Vec<String>> {
        let methods = self.lock_methods()?;
        Ok(methods
            .values()
            .map(|entry| entry.signature().to_string())
            .collect())
    }

    /// Introspection records for every registered method, sorted by name.
    pub fn describe(&self) -> Result<Vec<MethodInfo>> {
        let methods = self.lock_methods()?;
        let mut infos: Vec<MethodInfo> = methods.values().map(|entry| entry.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    /// Signature string of one method, if registered.
    pub fn signature(&self, name: &str) -> Result<Option<String>> {
        let methods = self.lock_methods()?;
        Ok(methods.get(name).map(|entry| entry.signature().to_string()))
    }

    /// Whether `name` is a registered qualified name.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.lock_methods()?.contains_key(name))
    }

    /// Number of registered methods.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_methods()?.len())
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock_methods()?.is_empty())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.methods.lock().map(|m| m.len()).ok();
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("policy", &self.policy)
            .field("methods", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{shared, Exported, MethodSet};
    use crate::value::ValueType;

    #[derive(Default)]
    struct Lamp {
        on: bool,
        brightness: u8,
    }

    impl Lamp {
        fn toggle(&mut self) {
            self.on = !self.on;
        }

        fn dim(&mut self, level: u8) -> u8 {
            let previous = self.brightness;
            self.brightness = level;
            previous
        }

        fn state(&self) -> (bool, u8) {
            (self.on, self.brightness)
        }
    }

    impl Exported for Lamp {
        fn type_name() -> &'static str {
            "lamp"
        }

        fn export(methods: &mut MethodSet<Self>) {
            methods
                .method("Toggle", Lamp::toggle)
                .method("Dim", Lamp::dim)
                .method("State", Lamp::state);
        }
    }

    struct BadName;

    impl Exported for BadName {
        fn export(methods: &mut MethodSet<Self>) {
            methods.method("Ok", |_: &BadName| true).method("not.ok", |_: &BadName| false);
        }
    }

    #[test]
    fn test_register_builds_signatures() {
        let registry = Registry::new();
        let count = registry.register_one(&shared(Lamp::default())).unwrap();
        assert_eq!(count, 3);

        let mut dump = registry.dump().unwrap();
        dump.sort();
        assert_eq!(
            dump,
            vec!["lamp.Dim(u8) u8", "lamp.State() (bool,u8)", "lamp.Toggle() "]
        );
    }

    #[test]
    fn test_namespace_prefixes_names() {
        let registry = Registry::with_namespace("home.devices");
        registry.register_one(&shared(Lamp::default())).unwrap();
        assert!(registry.contains("home.devices.lamp.Toggle").unwrap());
        assert!(!registry.contains("lamp.Toggle").unwrap());
    }

    #[test]
    fn test_call_converts_and_mutates() {
        let lamp = shared(Lamp::default());
        let registry = Registry::new();
        registry.register_one(&lamp).unwrap();

        registry.call("lamp.Toggle", vec![]).unwrap();
        let previous = registry.call("lamp.Dim", vec![Value::I64(40)]).unwrap();
        assert_eq!(previous, vec![Value::U8(0)]);

        let state = registry.call("lamp.State", vec![]).unwrap();
        assert_eq!(state, vec![Value::Bool(true), Value::U8(40)]);
        assert!(lamp.lock().unwrap().on);
    }

    #[test]
    fn test_call_errors_leave_state_untouched() {
        let lamp = shared(Lamp::default());
        let registry = Registry::new();
        registry.register_one(&lamp).unwrap();

        let err = registry.call("lamp.Dim", vec![Value::I64(1000)]).unwrap_err();
        assert!(matches!(
            err,
            CallregError::ArgumentTypeMismatch {
                index: 0,
                expected: ValueType::U8,
                actual: ValueType::I64,
                ..
            }
        ));

        let err = registry.call("lamp.Dim", vec![]).unwrap_err();
        assert!(matches!(
            err,
            CallregError::ArgumentCountMismatch {
                expected: 1,
                actual: 0,
                ..
            }
        ));

        assert_eq!(lamp.lock().unwrap().brightness, 0);
    }

    #[test]
    fn test_exact_policy() {
        let registry = Registry::builder()
            .conversion_policy(ConversionPolicy::Exact)
            .build();
        registry.register_one(&shared(Lamp::default())).unwrap();

        assert!(registry.call("lamp.Dim", vec![Value::I64(3)]).is_err());
        assert!(registry.call("lamp.Dim", vec![Value::U8(3)]).is_ok());
    }

    #[test]
    fn test_invalid_method_name_registers_nothing() {
        let registry = Registry::new();
        let err = registry
            .register(&[&shared(Lamp::default()), &shared(BadName)])
            .unwrap_err();

        assert!(matches!(err, CallregError::InvalidName { kind: "method", .. }));
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn test_invalid_namespace_registers_nothing() {
        for namespace in ["a b(", "home..devices", ".home", "home.", "x,y"] {
            let registry = Registry::with_namespace(namespace);
            let err = registry.register_one(&shared(Lamp::default())).unwrap_err();
            assert!(
                matches!(err, CallregError::InvalidName { kind: "namespace", ref name } if name == namespace),
                "{:?} should be rejected",
                namespace
            );
            assert!(registry.is_empty().unwrap());
        }
    }

    #[test]
    fn test_describe_is_sorted() {
        let registry = Registry::new();
        registry.register_one(&shared(Lamp::default())).unwrap();

        let names: Vec<_> = registry
            .describe()
            .unwrap()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(names, vec!["lamp.Dim", "lamp.State", "lamp.Toggle"]);
        assert_eq!(
            registry.signature("lamp.Dim").unwrap().as_deref(),
            Some("lamp.Dim(u8) u8")
        );
        assert_eq!(registry.signature("lamp.Nope").unwrap(), None);
    }
}

//! Method adapters: typed Rust methods exposed as generic callables.
//!
//! A type opts in by implementing [`Exported`] and listing its methods on a
//! [`MethodSet`]. Each entry is wrapped in an adapter that knows the method's
//! declared parameter and return types and converts between [`Value`]s and the
//! typed signature. Binding a method set to a [`Shared`] receiver produces
//! [`BoundMethod`]s, which is what the registry stores.
//!
//! # Example
//!
//! ```
//! use callreg::{Exported, MethodSet};
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! impl Counter {
//!     fn add(&mut self, n: i64) {
//!         self.count += n;
//!     }
//!
//!     fn count(&self) -> i64 {
//!         self.count
//!     }
//! }
//!
//! impl Exported for Counter {
//!     fn export(methods: &mut MethodSet<Self>) {
//!         methods.method("Add", Counter::add).method("Count", Counter::count);
//!     }
//! }
//! ```

use crate::error::{CallregError, Result};
use crate::value::{Typed, Value, ValueType};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Shared handle to a registered receiver.
///
/// The registry keeps a clone of the handle; the caller keeps theirs, and
/// mutations made through registered methods are visible through both.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a receiver in a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Return types a registered method may produce.
///
/// `()` means no return values; a scalar is one return value; a tuple is
/// several, in order.
pub trait Ret {
    fn types() -> Vec<ValueType>;
    fn into_values(self) -> Vec<Value>;
}

impl Ret for () {
    fn types() -> Vec<ValueType> {
        Vec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

macro_rules! impl_ret_scalar {
    ($($ty:ty),*) => {
        $(
            impl Ret for $ty {
                fn types() -> Vec<ValueType> {
                    vec![<$ty as Typed>::TYPE]
                }

                fn into_values(self) -> Vec<Value> {
                    vec![self.into_value()]
                }
            }
        )*
    };
}

impl_ret_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char, String, Vec<u8>);

macro_rules! impl_ret_tuple {
    ($($name:ident),+) => {
        impl<$($name: Typed),+> Ret for ($($name,)+) {
            fn types() -> Vec<ValueType> {
                vec![$($name::TYPE),+]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into_value()),+]
            }
        }
    };
}

impl_ret_tuple!(R1, R2);
impl_ret_tuple!(R1, R2, R3);
impl_ret_tuple!(R1, R2, R3, R4);

/// Marker for methods taking `&mut self`.
pub struct ByMut<Args>(PhantomData<Args>);

/// Marker for methods taking `&self`.
pub struct ByRef<Args>(PhantomData<Args>);

/// A function usable as a method of `T`.
///
/// Implemented for `Fn(&mut T, A1, ..) -> R` and `Fn(&T, A1, ..) -> R` with up to
/// [`MAX_ARITY`](crate::RegistryConfig::MAX_ARITY) parameters, where every
/// parameter is [`Typed`] and `R` is [`Ret`]. The `Kind` parameter only keeps
/// the two receiver kinds apart; callers never name it.
pub trait Method<T, Kind>: Send + Sync + 'static {
    /// Declared parameter types, receiver excluded.
    fn params() -> Vec<ValueType>;

    /// Declared return types.
    fn returns() -> Vec<ValueType>;

    /// Call with arguments already matched to [`Method::params`].
    fn invoke(&self, receiver: &mut T, args: Vec<Value>) -> Result<Vec<Value>>;
}

fn take_arg<A: Typed>(args: &mut std::vec::IntoIter<Value>) -> Result<A> {
    let value = args.next().ok_or_else(|| CallregError::AdapterMismatch {
        message: format!("missing {} argument", A::TYPE),
    })?;
    let actual = value.value_type();
    A::from_value(value).ok_or_else(|| CallregError::AdapterMismatch {
        message: format!("expected {}, got {}", A::TYPE, actual),
    })
}

macro_rules! impl_method {
    ($($arg:ident),*) => {
        impl<T, F, R, $($arg,)*> Method<T, ByMut<($($arg,)*)>> for F
        where
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: Ret,
            $($arg: Typed,)*
        {
            fn params() -> Vec<ValueType> {
                vec![$($arg::TYPE),*]
            }

            fn returns() -> Vec<ValueType> {
                R::types()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, receiver: &mut T, args: Vec<Value>) -> Result<Vec<Value>> {
                let mut args = args.into_iter();
                $(let $arg = take_arg::<$arg>(&mut args)?;)*
                Ok(self(receiver, $($arg),*).into_values())
            }
        }

        impl<T, F, R, $($arg,)*> Method<T, ByRef<($($arg,)*)>> for F
        where
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
            R: Ret,
            $($arg: Typed,)*
        {
            fn params() -> Vec<ValueType> {
                vec![$($arg::TYPE),*]
            }

            fn returns() -> Vec<ValueType> {
                R::types()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, receiver: &mut T, args: Vec<Value>) -> Result<Vec<Value>> {
                let mut args = args.into_iter();
                $(let $arg = take_arg::<$arg>(&mut args)?;)*
                Ok(self(&*receiver, $($arg),*).into_values())
            }
        }
    };
}

// One invocation per arity up to RegistryConfig::MAX_ARITY.
impl_method!();
impl_method!(A1);
impl_method!(A1, A2);
impl_method!(A1, A2, A3);
impl_method!(A1, A2, A3, A4);
impl_method!(A1, A2, A3, A4, A5);
impl_method!(A1, A2, A3, A4, A5, A6);

/// Whether a declared method is reachable through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Exported,
    Private,
}

type Invoke<T> = Box<dyn Fn(&mut T, Vec<Value>) -> Result<Vec<Value>> + Send + Sync>;

/// One method declared on a [`MethodSet`].
pub struct MethodDecl<T> {
    name: String,
    visibility: Visibility,
    params: Vec<ValueType>,
    returns: Vec<ValueType>,
    invoke: Invoke<T>,
}

impl<T> MethodDecl<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn returns(&self) -> &[ValueType] {
        &self.returns
    }
}

impl<T> std::fmt::Debug for MethodDecl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// The method table of one receiver type, in declaration order.
pub struct MethodSet<T> {
    methods: Vec<MethodDecl<T>>,
}

impl<T: 'static> MethodSet<T> {
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Declare an exported method.
    pub fn method<K, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Method<T, K>,
    {
        self.push(name, Visibility::Exported, f)
    }

    /// Declare a method that is part of the type but never registered.
    pub fn private<K, F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Method<T, K>,
    {
        self.push(name, Visibility::Private, f)
    }

    fn push<K, F>(&mut self, name: &str, visibility: Visibility, f: F) -> &mut Self
    where
        F: Method<T, K>,
    {
        self.methods.push(MethodDecl {
            name: name.to_string(),
            visibility,
            params: F::params(),
            returns: F::returns(),
            invoke: Box::new(move |receiver, args| f.invoke(receiver, args)),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodDecl<T>> {
        self.methods.iter()
    }

    /// Exported methods only.
    pub fn exported(&self) -> impl Iterator<Item = &MethodDecl<T>> {
        self.methods
            .iter()
            .filter(|m| m.visibility == Visibility::Exported)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<T: 'static> Default for MethodSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MethodSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.methods).finish()
    }
}

/// A type whose methods can be registered.
pub trait Exported: Sized + Send + 'static {
    /// Name used as the middle segment of qualified names.
    ///
    /// Defaults to the bare Rust type name, without module path or generic
    /// arguments.
    fn type_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Declare the type's methods.
    fn export(methods: &mut MethodSet<Self>);
}

/// Bare name of `T`: `my_crate::service::Service<u8>` becomes `Service`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

type BoundCall = Box<dyn Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync>;

/// An exported method with its receiver captured.
pub struct BoundMethod {
    pub(crate) name: String,
    pub(crate) params: Vec<ValueType>,
    pub(crate) returns: Vec<ValueType>,
    pub(crate) call: BoundCall,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn returns(&self) -> &[ValueType] {
        &self.returns
    }
}

impl std::fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

/// An instance that can be handed to [`Registry::register`](crate::Registry::register).
///
/// Implemented for [`Shared<T>`] of every [`Exported`] type, so a mixed list of
/// receivers can be passed as `&[&dyn Registrable]`.
pub trait Registrable {
    fn type_name(&self) -> &'static str;

    /// Bind every exported method to this receiver.
    fn bind(&self) -> Vec<BoundMethod>;
}

impl<T: Exported> Registrable for Shared<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn bind(&self) -> Vec<BoundMethod> {
        let mut set = MethodSet::new();
        T::export(&mut set);

        set.methods
            .into_iter()
            .filter(|m| m.visibility == Visibility::Exported)
            .map(|decl| {
                let receiver = Arc::clone(self);
                let invoke = decl.invoke;
                BoundMethod {
                    name: decl.name,
                    params: decl.params,
                    returns: decl.returns,
                    call: Box::new(move |args| {
                        let mut guard =
                            receiver
                                .lock()
                                .map_err(|_| CallregError::ReceiverPoisoned {
                                    type_name: T::type_name().to_string(),
                                })?;
                        invoke(&mut *guard, args)
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    #[derive(Default)]
    struct Sensor {
        reading: f64,
        label: String,
    }

    impl Sensor {
        fn calibrate(&mut self, offset: f64) {
            self.reading += offset;
        }

        fn reading(&self) -> f64 {
            self.reading
        }

        fn relabel(&mut self, label: String, suffix: char) -> (String, bool) {
            let previous = std::mem::replace(&mut self.label, format!("{}{}", label, suffix));
            (previous, true)
        }

        fn reset(&mut self) {
            self.reading = 0.0;
        }
    }

    impl Exported for Sensor {
        fn export(methods: &mut MethodSet<Self>) {
            methods
                .method("Calibrate", Sensor::calibrate)
                .method("Reading", Sensor::reading)
                .method("Relabel", Sensor::relabel)
                .private("reset", Sensor::reset);
        }
    }

    #[test]
    fn test_method_set_records_declared_types() {
        let mut set = MethodSet::<Sensor>::new();
        Sensor::export(&mut set);

        assert_eq!(set.len(), 4);
        let relabel = set.iter().find(|m| m.name() == "Relabel").unwrap();
        assert_eq!(relabel.params(), &[ValueType::String, ValueType::Char]);
        assert_eq!(relabel.returns(), &[ValueType::String, ValueType::Bool]);

        let reading = set.iter().find(|m| m.name() == "Reading").unwrap();
        assert!(reading.params().is_empty());
        assert_eq!(reading.returns(), &[ValueType::F64]);
    }

    #[test]
    fn test_private_methods_are_not_exported() {
        let mut set = MethodSet::<Sensor>::new();
        Sensor::export(&mut set);

        let exported: Vec<_> = set.exported().map(|m| m.name().to_string()).collect();
        assert_eq!(exported, vec!["Calibrate", "Reading", "Relabel"]);
        assert_eq!(
            set.iter().find(|m| m.name() == "reset").unwrap().visibility(),
            Visibility::Private
        );
    }

    #[test]
    fn test_bound_methods_share_receiver() {
        let sensor = shared(Sensor::default());
        let bound = sensor.bind();
        assert_eq!(bound.len(), 3);

        let calibrate = bound.iter().find(|m| m.name() == "Calibrate").unwrap();
        let reading = bound.iter().find(|m| m.name() == "Reading").unwrap();

        (calibrate.call)(vec![Value::F64(2.5)]).unwrap();
        assert_eq!((reading.call)(vec![]).unwrap(), vec![Value::F64(2.5)]);
        assert_eq!(sensor.lock().unwrap().reading, 2.5);
    }

    #[test]
    fn test_adapter_rejects_wrong_variant() {
        let sensor = shared(Sensor::default());
        let bound = sensor.bind();
        let calibrate = bound.iter().find(|m| m.name() == "Calibrate").unwrap();

        let err = (calibrate.call)(vec![Value::Bool(true)]).unwrap_err();
        assert_eq!(err.to_string(), "Adapter mismatch: expected f64, got bool");
    }

    #[test]
    fn test_multiple_returns_in_order() {
        let sensor = shared(Sensor {
            reading: 0.0,
            label: "old".into(),
        });
        let bound = sensor.bind();
        let relabel = bound.iter().find(|m| m.name() == "Relabel").unwrap();

        let out = (relabel.call)(vec![Value::from("new"), Value::Char('!')]).unwrap();
        assert_eq!(out, vec![Value::from("old"), Value::Bool(true)]);
        assert_eq!(sensor.lock().unwrap().label, "new!");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Sensor>(), "Sensor");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
        assert_eq!(<Sensor as Exported>::type_name(), "Sensor");
    }

    #[test]
    fn test_max_arity_method() {
        struct Wide;

        fn sum(_: &Wide, a: i8, b: i16, c: i32, d: i64, e: u8, f: u16) -> i64 {
            i64::from(a) + i64::from(b) + i64::from(c) + d + i64::from(e) + i64::from(f)
        }

        let mut set = MethodSet::<Wide>::new();
        set.method("Sum", sum);
        let decl = set.iter().next().unwrap();
        assert_eq!(decl.params().len(), RegistryConfig::MAX_ARITY);

        let mut wide = Wide;
        let out = (decl.invoke)(
            &mut wide,
            vec![
                Value::I8(1),
                Value::I16(2),
                Value::I32(3),
                Value::I64(4),
                Value::U8(5),
                Value::U16(6),
            ],
        )
        .unwrap();
        assert_eq!(out, vec![Value::I64(21)]);
    }
}

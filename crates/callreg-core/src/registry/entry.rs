//! Registered method entries and the naming rules that key them.

use crate::config::RegistryConfig;
use crate::convert::{convert, ConversionPolicy};
use crate::error::{CallregError, Result};
use crate::method::BoundMethod;
use crate::value::{Value, ValueType};
use serde::Serialize;

/// Build the key a method is registered under: `[namespace.]TypeName.MethodName`.
pub fn qualified_name(namespace: Option<&str>, type_name: &str, method: &str) -> String {
    let sep = RegistryConfig::NAMESPACE_SEPARATOR;
    match namespace {
        Some(ns) => format!("{}{}{}{}{}", ns, sep, type_name, sep, method),
        None => format!("{}{}{}", type_name, sep, method),
    }
}

/// Render `name(arg1,arg2) ret`.
///
/// Multiple return types are parenthesized as `(ret1,ret2)`; with no return
/// types the signature ends in the separating space.
pub fn signature(name: &str, params: &[ValueType], returns: &[ValueType]) -> String {
    let args = join_types(params);
    let rets = join_types(returns);
    if returns.len() > 1 {
        format!("{}({}) ({})", name, args, rets)
    } else {
        format!("{}({}) {}", name, args, rets)
    }
}

fn join_types(types: &[ValueType]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(",")
}

/// Reject names that are empty, contain whitespace, or contain a character that
/// would make qualified names or signatures ambiguous.
pub(crate) fn validate_segment(kind: &'static str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || RegistryConfig::RESERVED_NAME_CHARS.contains(&c)
        });
    if invalid {
        return Err(CallregError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Introspection record for one registered method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<ValueType>,
    pub returns: Vec<ValueType>,
    pub signature: String,
}

/// One registered callable. Immutable once created.
pub struct MethodEntry {
    name: String,
    signature: String,
    method: BoundMethod,
}

impl MethodEntry {
    pub(crate) fn new(name: String, method: BoundMethod) -> Self {
        let signature = signature(&name, &method.params, &method.returns);
        Self {
            name,
            signature,
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn params(&self) -> &[ValueType] {
        &self.method.params
    }

    pub fn returns(&self) -> &[ValueType] {
        &self.method.returns
    }

    pub fn info(&self) -> MethodInfo {
        MethodInfo {
            name: self.name.clone(),
            params: self.method.params.clone(),
            returns: self.method.returns.clone(),
            signature: self.signature.clone(),
        }
    }

    /// Check arity and convert every argument to its declared type.
    ///
    /// Either all arguments match or nothing is returned, so the method is never
    /// invoked with a partially converted list.
    pub(crate) fn match_arguments(
        &self,
        args: Vec<Value>,
        policy: ConversionPolicy,
    ) -> Result<Vec<Value>> {
        let params = &self.method.params;
        if args.len() != params.len() {
            return Err(CallregError::ArgumentCountMismatch {
                name: self.name.clone(),
                expected: params.len(),
                actual: args.len(),
            });
        }

        args.into_iter()
            .zip(params.iter().copied())
            .enumerate()
            .map(|(index, (arg, expected))| {
                let actual = arg.value_type();
                convert(arg, expected, policy).map_err(|source| {
                    CallregError::ArgumentTypeMismatch {
                        name: self.name.clone(),
                        index,
                        expected,
                        actual,
                        source,
                    }
                })
            })
            .collect()
    }

    /// Invoke with already matched arguments and re-type the results.
    pub(crate) fn invoke(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        let rets = (self.method.call)(args)?;
        let declared = &self.method.returns;
        if rets.len() != declared.len() {
            return Err(CallregError::ReturnMismatch {
                name: self.name.clone(),
                message: format!("expected {} values, got {}", declared.len(), rets.len()),
            });
        }

        rets.into_iter()
            .zip(declared.iter().copied())
            .map(|(ret, ty)| {
                convert(ret, ty, ConversionPolicy::Lenient).map_err(|e| {
                    CallregError::ReturnMismatch {
                        name: self.name.clone(),
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

//! Capability table standing in for runtime reflection.
//!
//! Every bean type a deployment may invoke is declared up front as a [`TypeDecl`]:
//! its kind, its parents and the methods it declares. The [`resolver`] walks this
//! table to bind a textual [`Signature`](crate::core::signature::Signature) to a
//! single method.

pub mod resolver;

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::core::FieldValue;
use crate::error::{Result, WireError};

/// The root of every reference type.
pub const OBJECT: &str = "Object";

/// Names of the primitive types. Primitives are assignable only to themselves.
pub const PRIMITIVES: [&str; 8] = [
    "boolean", "byte", "short", "char", "int", "long", "float", "double",
];

/// A type-erased bean instance.
pub type Bean = Arc<dyn Any + Send + Sync>;

/// The body of a declared method.
pub type Callable =
    Arc<dyn Fn(&Bean, &[FieldValue]) -> std::result::Result<FieldValue, InvocationError> + Send + Sync>;

/// A failure raised by a method body.
///
/// `kind` classifies the failure (the analogue of an exception type) and is what
/// delay policies match on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct InvocationError {
    pub kind: String,
    pub message: String,
}

impl InvocationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Primitive,
}

/// A method declared directly on a type.
#[derive(Clone)]
pub struct MethodDecl {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) returns: String,
    pub(crate) body: Option<Callable>,
}

impl MethodDecl {
    /// Declares a method implemented by `body` on receivers of Rust type `T`.
    pub fn new<T, F>(name: &str, params: &[&str], returns: &str, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &[FieldValue]) -> std::result::Result<FieldValue, InvocationError>
            + Send
            + Sync
            + 'static,
    {
        let method = name.to_string();
        let callable: Callable = Arc::new(move |bean: &Bean, args: &[FieldValue]| {
            let receiver = bean.downcast_ref::<T>().ok_or_else(|| {
                InvocationError::new(
                    "IllegalArgumentException",
                    format!("object is not an instance of the declaring type of {}", method),
                )
            })?;
            body(receiver, args)
        });

        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns: returns.to_string(),
            body: Some(callable),
        }
    }

    /// Declares a method without a body, as interfaces do.
    pub fn abstract_method(name: &str, params: &[&str], returns: &str) -> Self {
        Self {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            returns: returns.to_string(),
            body: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn returns(&self) -> &str {
        &self.returns
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// A declared type with its parents and directly declared methods.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) superclass: Option<String>,
    pub(crate) interfaces: Vec<String>,
    pub(crate) methods: Vec<MethodDecl>,
}

impl TypeDecl {
    /// A class extending `Object` unless told otherwise.
    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != OBJECT).then(|| OBJECT.to_string());
        Self {
            name,
            kind: TypeKind::Class,
            superclass,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Primitive,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the superclass of a class, or adds an extended interface to an interface.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        match self.kind {
            TypeKind::Interface => self.interfaces.push(parent.into()),
            _ => self.superclass = Some(parent.into()),
        }
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// The parents searched during resolution: the superclass of a class, or
    /// every extended interface of an interface.
    pub(crate) fn lookup_parents(&self) -> Vec<&str> {
        match self.kind {
            TypeKind::Interface => self.interfaces.iter().map(String::as_str).collect(),
            _ => self.superclass.iter().map(String::as_str).collect(),
        }
    }

    /// All direct supertypes, for assignability and dispatch.
    fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.superclass
            .iter()
            .chain(self.interfaces.iter())
            .map(String::as_str)
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Class => write!(f, "class {}", self.name),
            TypeKind::Interface => write!(f, "interface {}", self.name),
            TypeKind::Primitive => write!(f, "{}", self.name),
        }
    }
}

/// The declared types of one deployment.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<String, TypeDecl>,
}

impl TypeTable {
    /// An empty table, without even `Object`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table preloaded with `Object`, the primitives and common library types.
    pub fn new() -> Self {
        let mut table = Self::empty();
        for primitive in PRIMITIVES {
            table.declare(TypeDecl::primitive(primitive));
        }
        table.declare(
            TypeDecl::class(OBJECT)
                .method(MethodDecl::abstract_method("hashCode", &[], "int"))
                .method(MethodDecl::abstract_method("equals", &[OBJECT], "boolean"))
                .method(MethodDecl::abstract_method("toString", &[], "String")),
        );
        table.declare(
            TypeDecl::interface("CharSequence")
                .method(MethodDecl::abstract_method("length", &[], "int")),
        );
        table.declare(
            TypeDecl::interface("Comparable")
                .method(MethodDecl::abstract_method("compareTo", &[OBJECT], "int")),
        );
        table.declare(
            TypeDecl::class("String")
                .implements("CharSequence")
                .implements("Comparable"),
        );
        table.declare(TypeDecl::class("Number"));
        for boxed in ["Integer", "Long", "Double"] {
            table.declare(TypeDecl::class(boxed).extends("Number").implements("Comparable"));
        }
        table.declare(TypeDecl::interface("Collection"));
        table.declare(TypeDecl::interface("List").extends("Collection"));
        table.declare(TypeDecl::interface("Map"));
        table
    }

    /// Registers a type, replacing any previous declaration with the same name.
    pub fn declare(&mut self, decl: TypeDecl) -> &mut Self {
        if self.types.contains_key(&decl.name) {
            log::warn!("Type {} declared twice, replacing the first declaration", decl.name);
        }
        self.types.insert(decl.name.clone(), decl);
        self
    }

    pub fn with(mut self, decl: TypeDecl) -> Self {
        self.declare(decl);
        self
    }

    pub fn get(&self, name: &str) -> Result<&TypeDecl> {
        self.types
            .get(name)
            .ok_or_else(|| WireError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn is_primitive(&self, name: &str) -> bool {
        match self.types.get(name) {
            Some(decl) => decl.kind == TypeKind::Primitive,
            None => PRIMITIVES.contains(&name),
        }
    }

    /// Whether a value of type `from` may be passed where `to` is expected.
    pub fn is_assignable(&self, to: &str, from: &str) -> bool {
        if to == from {
            return true;
        }
        if self.is_primitive(to) || self.is_primitive(from) {
            return false;
        }
        if to == OBJECT {
            return true;
        }

        let mut seen = HashSet::new();
        let mut todo = vec![from];
        while let Some(current) = todo.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(decl) = self.types.get(current) {
                for parent in decl.supertypes() {
                    if parent == to {
                        return true;
                    }
                    todo.push(parent);
                }
            }
        }
        false
    }

    /// Finds the most derived body for `name(params)` on `concrete`: the type
    /// itself, then its superclass chain, then its interfaces.
    pub fn implementation(&self, concrete: &str, name: &str, params: &[String]) -> Option<&Callable> {
        let mut seen = HashSet::new();
        let mut interfaces = Vec::new();

        let mut current = Some(concrete);
        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                log::warn!("Cyclic superclass chain through {}", type_name);
                break;
            }
            let Some(decl) = self.types.get(type_name) else {
                break;
            };
            if let Some(body) = Self::declared_body(decl, name, params) {
                return Some(body);
            }
            interfaces.extend(decl.interfaces.iter().map(String::as_str));
            current = decl.superclass.as_deref();
        }

        while let Some(type_name) = interfaces.pop() {
            if !seen.insert(type_name) {
                continue;
            }
            if let Some(decl) = self.types.get(type_name) {
                if let Some(body) = Self::declared_body(decl, name, params) {
                    return Some(body);
                }
                interfaces.extend(decl.interfaces.iter().map(String::as_str));
            }
        }
        None
    }

    fn declared_body<'a>(decl: &'a TypeDecl, name: &str, params: &[String]) -> Option<&'a Callable> {
        decl.methods
            .iter()
            .filter(|m| m.name == name && m.params == params)
            .find_map(|m| m.body.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assignability() {
        let table = TypeTable::new();
        assert!(table.is_assignable("Object", "String"));
        assert!(table.is_assignable("CharSequence", "String"));
        assert!(table.is_assignable("Number", "Long"));
        assert!(table.is_assignable("Object", "CharSequence"));
        assert!(!table.is_assignable("String", "Object"));
        assert!(!table.is_assignable("Object", "int"));
        assert!(!table.is_assignable("float", "int"));
        assert!(table.is_assignable("int", "int"));
    }

    #[test]
    fn test_interface_extension_is_transitive() {
        let table = TypeTable::new()
            .with(TypeDecl::interface("Shape"))
            .with(TypeDecl::interface("Polygon").extends("Shape"))
            .with(TypeDecl::class("Square").implements("Polygon"));
        assert!(table.is_assignable("Shape", "Square"));
        assert!(!table.is_assignable("Square", "Shape"));
    }

    #[test]
    fn test_implementation_prefers_most_derived() {
        struct Counter;

        let table = TypeTable::new()
            .with(TypeDecl::class("Base").method(MethodDecl::new::<Counter, _>(
                "id",
                &["long"],
                "Number",
                |_, args| Ok(args[0].clone()),
            )))
            .with(TypeDecl::class("Derived").extends("Base").method(MethodDecl::new::<Counter, _>(
                "id",
                &["long"],
                "Number",
                |_, args| Ok(json!(args[0].as_i64().unwrap_or_default() * 2)),
            )));

        let bean: Bean = Arc::new(Counter);
        let params = vec!["long".to_string()];
        let base = table.implementation("Base", "id", &params).unwrap();
        let derived = table.implementation("Derived", "id", &params).unwrap();
        assert_eq!(base(&bean, &[json!(21)]).unwrap(), json!(21));
        assert_eq!(derived(&bean, &[json!(21)]).unwrap(), json!(42));
        assert!(table.implementation("Derived", "id", &[]).is_none());
    }

    #[test]
    fn test_implementation_stops_on_cyclic_superclass() {
        let table = TypeTable::new()
            .with(TypeDecl::class("A").extends("B"))
            .with(TypeDecl::class("B").extends("A"));
        assert!(table.implementation("A", "f", &["int".to_string()]).is_none());
        assert!(!table.is_assignable("String", "A"));
    }

    #[test]
    fn test_wrong_receiver() {
        struct Expected;
        struct Other;

        let method = MethodDecl::new::<Expected, _>("f", &[], "void", |_, _| Ok(FieldValue::Null));
        let bean: Bean = Arc::new(Other);
        let body = method.body.unwrap();
        let err = body(&bean, &[]).unwrap_err();
        assert_eq!(err.kind(), "IllegalArgumentException");
    }

    #[test]
    fn test_display_kind() {
        let table = TypeTable::new();
        assert_eq!(table.get("String").unwrap().to_string(), "class String");
        assert_eq!(table.get("Map").unwrap().to_string(), "interface Map");
        assert!(matches!(table.get("Nope"), Err(WireError::UnknownType(_))));
    }
}

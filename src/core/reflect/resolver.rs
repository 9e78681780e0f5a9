use std::collections::HashMap;
use std::fmt;

use crate::core::FieldValue;
use crate::core::reflect::{Bean, Callable, InvocationError, MethodDecl, TypeKind, TypeTable};
use crate::core::signature::Signature;
use crate::error::{Result, WireError};

/// A method found while searching a type hierarchy.
#[derive(Clone)]
pub struct Candidate {
    owner: String,
    owner_kind: TypeKind,
    name: String,
    parameter_types: Vec<String>,
    returns: String,
    body: Option<Callable>,
}

impl Candidate {
    fn declared(owner: &str, owner_kind: TypeKind, method: &MethodDecl) -> Self {
        Self {
            owner: owner.to_string(),
            owner_kind,
            name: method.name.clone(),
            parameter_types: method.params.clone(),
            returns: method.returns.clone(),
            body: method.body.clone(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn returns(&self) -> &str {
        &self.returns
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    pub fn owner_kind(&self) -> TypeKind {
        self.owner_kind
    }
}

/// Canonical rendering, used for ambiguity messages.
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_abstract() {
            f.write_str("abstract ")?;
        }
        write!(
            f,
            "{} {}.{}({})",
            self.returns,
            self.owner,
            self.name,
            self.parameter_types.join(",")
        )
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Candidate({})", self)
    }
}

/// `a` refines `b` when every parameter type of `a` is assignable to the
/// corresponding parameter type of `b`.
pub fn refines(types: &TypeTable, a: &Candidate, b: &Candidate) -> bool {
    a.parameter_types
        .iter()
        .zip(&b.parameter_types)
        .all(|(from, to)| types.is_assignable(to, from))
}

fn ambiguity(a: &Candidate, b: &Candidate) -> WireError {
    let mut readable = [a.to_string(), b.to_string()];
    readable.sort();
    let [first, second] = readable;
    WireError::AmbiguousMethod { first, second }
}

/// Finds the single method named `name` taking `arity` arguments on `type_name`
/// or its ancestors.
///
/// The winner is the candidate every other candidate refines. Directly
/// declared candidates that refine another one are discarded first; two
/// incomparable survivors are ambiguous, as is an inherited candidate that
/// does not refine the local one.
pub fn resolve(types: &TypeTable, type_name: &str, name: &str, arity: usize) -> Result<Candidate> {
    resolve_along(types, type_name, name, arity, &mut Vec::new())
}

fn resolve_along<'a>(
    types: &'a TypeTable,
    type_name: &'a str,
    name: &str,
    arity: usize,
    path: &mut Vec<&'a str>,
) -> Result<Candidate> {
    if path.contains(&type_name) {
        path.push(type_name);
        return Err(WireError::Config(format!(
            "cyclic type hierarchy: {}",
            path.join(" -> ")
        )));
    }
    let decl = types.get(type_name)?;

    let declared: Vec<Candidate> = decl
        .methods
        .iter()
        .filter(|m| m.name == name && m.params.len() == arity)
        .map(|m| Candidate::declared(&decl.name, decl.kind, m))
        .collect();
    let mut best = most_general(types, declared)?;

    path.push(type_name);
    for parent in decl.lookup_parents() {
        let inherited = match resolve_along(types, parent, name, arity, path) {
            Ok(candidate) => candidate,
            Err(WireError::NoSuchMethod { .. }) => continue,
            Err(e) => return Err(e),
        };
        match &best {
            None => best = Some(inherited),
            Some(current) => {
                if !refines(types, &inherited, current) {
                    return Err(ambiguity(current, &inherited));
                }
            }
        }
    }
    path.pop();

    best.ok_or_else(|| WireError::NoSuchMethod {
        owner: decl.to_string(),
        name: name.to_string(),
        arity,
    })
}

/// Reduces directly declared candidates to the one all others refine.
fn most_general(types: &TypeTable, candidates: Vec<Candidate>) -> Result<Option<Candidate>> {
    let mut survivors: Vec<Candidate> = candidates
        .iter()
        .filter(|c| {
            !candidates
                .iter()
                .any(|o| refines(types, c, o) && !refines(types, o, c))
        })
        .cloned()
        .collect();

    survivors.sort_by_cached_key(|c| c.to_string());
    for (i, a) in survivors.iter().enumerate() {
        if let Some(b) = survivors[i + 1..]
            .iter()
            .find(|b| !refines(types, a, b) && !refines(types, b, a))
        {
            return Err(ambiguity(a, b));
        }
    }

    // Survivors left now refine each other; keep declaration order among them.
    Ok(candidates
        .into_iter()
        .find(|c| survivors.iter().any(|s| refines(types, c, s) && refines(types, s, c))))
}

/// A signature bound to the method it invokes.
#[derive(Debug, Clone)]
pub struct Binding {
    signature: Signature,
    candidate: Candidate,
}

impl Binding {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Invokes the bound method on `bean`, dispatching to the most derived
    /// body for the bean's concrete type.
    pub fn invoke(
        &self,
        types: &TypeTable,
        concrete: &str,
        bean: &Bean,
        arguments: &[FieldValue],
    ) -> std::result::Result<FieldValue, InvocationError> {
        let body = types
            .implementation(concrete, &self.candidate.name, &self.candidate.parameter_types)
            .or(self.candidate.body.as_ref())
            .ok_or_else(|| {
                InvocationError::new(
                    "AbstractMethodError",
                    format!("{} has no implementation on {}", self.candidate, concrete),
                )
            })?;
        body(bean, arguments)
    }
}

/// Memoizes bindings per `(type, signature)` for the lifetime of one component.
#[derive(Debug, Default)]
pub struct MethodResolver {
    bindings: HashMap<(String, Signature), Binding>,
}

impl MethodResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, types: &TypeTable, type_name: &str, signature: &Signature) -> Result<Binding> {
        let key = (type_name.to_string(), signature.clone());
        if let Some(binding) = self.bindings.get(&key) {
            return Ok(binding.clone());
        }

        let candidate = resolve(types, type_name, signature.function(), signature.arity())?;
        log::debug!("{} on {} resolved to {}", signature, type_name, candidate);
        let binding = Binding {
            signature: signature.clone(),
            candidate,
        };
        self.bindings.insert(key, binding.clone());
        Ok(binding)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

//! Environments map names to what the checker knows about them, in four independent namespaces.
//! Values may always be rebound; types, modules and signatures refuse to shadow a binding of the
//! same extension.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use im_rc::OrdMap;
use itertools::Itertools;

use crate::{
    signature::{Existential, Signature},
    types::{TyName, TypeFun, TypeScheme},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Type,
    Module,
    Signature,
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Type => write!(f, "type"),
            Self::Module => write!(f, "module"),
            Self::Signature => write!(f, "signature"),
        }
    }
}

/// A name bound twice where only one binding is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clash {
    pub namespace: Namespace,
    pub name: String,
}

impl Clash {
    fn new(namespace: Namespace, name: &str) -> Self {
        Self {
            namespace,
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Variable,
    /// A datatype constructor and the number of arguments it takes.
    Constructor(usize),
}

#[derive(Debug, Clone)]
pub struct ValueDecl {
    pub kind: ValueKind,
    pub scheme: Rc<TypeScheme>,
}

impl ValueDecl {
    pub fn variable(scheme: Rc<TypeScheme>) -> Self {
        Self {
            kind: ValueKind::Variable,
            scheme,
        }
    }

    pub fn constructor(arity: usize, scheme: Rc<TypeScheme>) -> Self {
        Self {
            kind: ValueKind::Constructor(arity),
            scheme,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, ValueKind::Constructor(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Env {
    pub values: OrdMap<String, ValueDecl>,
    pub types: OrdMap<String, Rc<TypeFun>>,
    pub modules: OrdMap<String, Signature>,
    pub signatures: OrdMap<String, Rc<Existential>>,
}

/// `OrdMap::union` keeps the entries of the larger map on a clash, so the bias is spelled out.
fn right_union<V: Clone>(
    left: &OrdMap<String, V>,
    right: &OrdMap<String, V>,
) -> OrdMap<String, V> {
    left.clone().union_with(right.clone(), |_, newer| newer)
}

fn first_clash<V: Clone>(
    left: &OrdMap<String, V>,
    right: &OrdMap<String, V>,
    namespace: Namespace,
) -> Result<(), Clash> {
    match right.keys().find(|name| left.contains_key(*name)) {
        Some(name) => Err(Clash::new(namespace, name)),
        None => Ok(()),
    }
}

impl Env {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.types.is_empty()
            && self.modules.is_empty()
            && self.signatures.is_empty()
    }

    pub fn insert_value(&mut self, name: impl Into<String>, decl: ValueDecl) {
        self.values.insert(name.into(), decl);
    }

    pub fn insert_type(&mut self, name: impl Into<String>, fun: TypeFun) {
        self.types.insert(name.into(), Rc::new(fun));
    }

    pub fn insert_signature(&mut self, name: impl Into<String>, sig: Existential) {
        self.signatures.insert(name.into(), Rc::new(sig));
    }

    /// Builds an environment with a single module.
    pub fn module(name: impl Into<String>, sig: Signature) -> Self {
        let mut env = Self::default();
        env.modules.insert(name.into(), sig);
        env
    }

    /// Right biased union: bindings of `other` override the ones of `self` in every namespace.
    pub fn adjoin(&self, other: &Self) -> Self {
        Self {
            values: right_union(&self.values, &other.values),
            types: right_union(&self.types, &other.types),
            modules: right_union(&self.modules, &other.modules),
            signatures: right_union(&self.signatures, &other.signatures),
        }
    }

    /// Union of two environments that must not bind a common name in any namespace.
    pub fn disjoint_union(&self, other: &Self) -> Result<Self, Clash> {
        first_clash(&self.values, &other.values, Namespace::Value)?;
        first_clash(&self.types, &other.types, Namespace::Type)?;
        first_clash(&self.modules, &other.modules, Namespace::Module)?;
        first_clash(&self.signatures, &other.signatures, Namespace::Signature)?;
        Ok(self.adjoin(other))
    }

    /// Sequential extension: later values shadow earlier ones, every other namespace refuses to
    /// rebind a name.
    pub fn extend(&self, other: &Self) -> Result<Self, Clash> {
        first_clash(&self.types, &other.types, Namespace::Type)?;
        first_clash(&self.modules, &other.modules, Namespace::Module)?;
        first_clash(&self.signatures, &other.signatures, Namespace::Signature)?;
        Ok(self.adjoin(other))
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.types.iter().map(|(name, fun)| match fun.params.as_slice() {
            [] => format!("type {name} = {}", fun.body),
            params => format!("type ({}) {name} = {}", params.iter().join(", "), fun.body),
        });
        let values = self.values.iter().map(|(name, decl)| match decl.kind {
            ValueKind::Variable => format!("val {name} : {}", decl.scheme),
            ValueKind::Constructor(_) => format!("con {name} : {}", decl.scheme),
        });
        let modules = self
            .modules
            .iter()
            .map(|(name, sig)| format!("module {name} : {sig}"));
        let signatures = self
            .signatures
            .iter()
            .map(|(name, sig)| format!("signature {name} = {sig}"));

        write!(
            f,
            "{}",
            types.chain(values).chain(modules).chain(signatures).join("; ")
        )
    }
}

/// What a declaration or specification contributes to its scope: the environment it binds and the
/// type names it introduces abstractly.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub bound: Vec<TyName>,
    pub env: Env,
}

impl Fragment {
    pub fn new(bound: Vec<TyName>, env: Env) -> Self {
        Self { bound, env }
    }

    pub fn from_env(env: Env) -> Self {
        Self::new(Vec::new(), env)
    }

    fn join(mut self, other: Self, env: Env) -> Self {
        self.bound.extend(other.bound);
        Self::new(self.bound, env)
    }

    pub fn disjoint_union(self, other: Self) -> Result<Self, Clash> {
        let env = self.env.disjoint_union(&other.env)?;
        Ok(self.join(other, env))
    }

    pub fn extend(self, other: Self) -> Result<Self, Clash> {
        let env = self.env.extend(&other.env)?;
        Ok(self.join(other, env))
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.bound.is_empty() {
            write!(f, "exists {}. ", self.bound.iter().join(" "))?;
        }
        write!(f, "{}", self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MonoType;
    use kestrel_tree::r#abstract::BaseType;

    fn int_value() -> ValueDecl {
        ValueDecl::variable(MonoType::base(BaseType::Int).to_poly())
    }

    fn unit_type() -> TypeFun {
        TypeFun::new(vec![], MonoType::base(BaseType::Unit))
    }

    #[test]
    fn adjoin_prefers_the_right_side() {
        let mut left = Env::default();
        left.insert_value("x", int_value());

        let mut right = Env::default();
        right.insert_value(
            "x",
            ValueDecl::variable(MonoType::base(BaseType::Text).to_poly()),
        );

        let joined = left.adjoin(&right);
        assert_eq!(joined.values["x"].scheme.to_string(), "string");
    }

    #[test]
    fn disjoint_union_reports_the_colliding_name() {
        let mut left = Env::default();
        left.insert_value("f", int_value());
        let mut right = Env::default();
        right.insert_value("f", int_value());

        let clash = left.disjoint_union(&right).unwrap_err();
        assert_eq!(clash, Clash::new(Namespace::Value, "f"));
    }

    #[test]
    fn extension_shadows_values_but_not_types() {
        let mut left = Env::default();
        left.insert_value("x", int_value());
        left.insert_type("t", unit_type());

        let mut values = Env::default();
        values.insert_value("x", int_value());
        assert!(left.extend(&values).is_ok());

        let mut types = Env::default();
        types.insert_type("t", unit_type());
        let clash = left.extend(&types).unwrap_err();
        assert_eq!(clash.namespace, Namespace::Type);
    }

    #[test]
    fn adjoin_prefers_the_right_side_even_when_it_is_smaller() {
        let mut left = Env::default();
        for name in ["a", "b", "c", "x"] {
            left.insert_value(name, int_value());
        }
        left.insert_type("t", unit_type());

        let mut right = Env::default();
        right.insert_value(
            "x",
            ValueDecl::variable(MonoType::base(BaseType::Text).to_poly()),
        );
        right.insert_type(
            "t",
            TypeFun::new(vec![], MonoType::base(BaseType::Bool)),
        );

        let joined = left.adjoin(&right);
        assert_eq!(joined.values.len(), 4);
        assert_eq!(joined.values["x"].scheme.to_string(), "string");
        assert_eq!(joined.types["t"].to_string(), "bool");
        assert_eq!(joined.values["a"].scheme.to_string(), "int");
    }
}

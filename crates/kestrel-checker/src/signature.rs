//! Semantic signatures of modules. A structure signature is an environment, a functor signature
//! abstracts over the type names of its parameter, and an [Existential] packs a signature together
//! with the names it keeps abstract.
//!
//! Type names are replaced through a [Realization], which is the only way the module layer
//! changes the meaning of a type.

use std::{
    fmt::{self, Display},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;

use crate::{
    context::Ctx,
    env::{Env, Fragment, ValueDecl},
    types::{Hole, MonoType, TyName, Type, TypeFun, TypeNames, TypeScheme},
};

#[derive(Debug, Clone)]
pub enum Signature {
    Structure(Env),
    Functor(Rc<Functor>),
}

/// `functor (bound. param) -> result`: the parameter names are universally quantified.
#[derive(Debug, Clone)]
pub struct Functor {
    pub bound: Vec<TyName>,
    pub param: Signature,
    pub result: Existential,
}

#[derive(Debug, Clone)]
pub struct Existential {
    pub bound: Vec<TyName>,
    pub sig: Signature,
}

impl Signature {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Structure(_) => "a structure",
            Self::Functor(_) => "a functor",
        }
    }

    pub fn as_structure(&self) -> Option<&Env> {
        match self {
            Self::Structure(env) => Some(env),
            Self::Functor(_) => None,
        }
    }
}

impl Existential {
    pub fn new(bound: Vec<TyName>, sig: Signature) -> Self {
        Self { bound, sig }
    }

    /// A signature without abstract names.
    pub fn concrete(sig: Signature) -> Self {
        Self::new(Vec::new(), sig)
    }

    /// Packs what a sequence of declarations or specifications produced.
    pub fn pack(fragment: Fragment) -> Self {
        Self::new(fragment.bound, Signature::Structure(fragment.env))
    }

    /// Opens the existential, replacing every abstract name by a fresh one so that two opened
    /// copies never share them.
    pub fn unpack(&self, ctx: &Ctx) -> (Vec<TyName>, Signature) {
        if self.bound.is_empty() {
            return (Vec::new(), self.sig.clone());
        }

        let mut realization = Realization::default();
        let fresh = self
            .bound
            .iter()
            .map(|name| {
                let new = ctx.new_stamp(&name.name);
                realization.insert_name(name.clone(), new.clone());
                new
            })
            .collect::<Vec<_>>();

        debug!(
            "unpacking {} as {}",
            self.bound.iter().map(|n| format!("{n}/{}", n.stamp)).join(" "),
            fresh.iter().map(|n| format!("{n}/{}", n.stamp)).join(" ")
        );

        (fresh, self.sig.realize(&realization))
    }

    /// The same existential with fresh names for its binders.
    pub fn refresh(&self, ctx: &Ctx) -> Self {
        let (bound, sig) = self.unpack(ctx);
        Self::new(bound, sig)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure(env) if env.is_empty() => write!(f, "sig end"),
            Self::Structure(env) => write!(f, "sig {env} end"),
            Self::Functor(functor) => write!(f, "{functor}"),
        }
    }
}

impl Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bound.is_empty() {
            write!(f, "functor ({}) -> {}", self.param, self.result)
        } else {
            let bound = self.bound.iter().join(" ");
            write!(f, "functor ({bound}. {}) -> {}", self.param, self.result)
        }
    }
}

impl Display for Existential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bound.is_empty() {
            write!(f, "{}", self.sig)
        } else {
            write!(f, "exists {}. {}", self.bound.iter().join(" "), self.sig)
        }
    }
}

#[derive(Debug, Clone)]
pub enum Realized {
    Name(TyName),
    Fun(Rc<TypeFun>),
}

/// A finite map from type names to what they stand for.
#[derive(Debug, Clone, Default)]
pub struct Realization(IndexMap<TyName, Realized>);

impl Realization {
    pub fn insert_name(&mut self, from: TyName, to: TyName) {
        self.0.insert(from, Realized::Name(to));
    }

    pub fn insert_fun(&mut self, from: TyName, to: Rc<TypeFun>) {
        self.0.insert(from, Realized::Fun(to));
    }

    pub fn contains(&self, name: &TyName) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The realization that leaves `binders` alone.
    fn under(&self, binders: &[TyName]) -> Option<Self> {
        binders.iter().any(|b| self.contains(b)).then(|| {
            let mut inner = self.clone();
            for binder in binders {
                inner.0.shift_remove(binder);
            }
            inner
        })
    }

    fn apply(&self, name: &TyName, args: Vec<Type>) -> Option<Type> {
        match self.0.get(name)? {
            Realized::Name(new) => Some(MonoType::application(new.clone(), args)),
            Realized::Fun(fun) => Some(fun.apply(args)),
        }
    }
}

/// Things whose type names can be replaced by a [Realization]. Binders are never replaced.
pub trait Realize {
    fn realize(&self, realization: &Realization) -> Self;
}

impl Realize for Type {
    fn realize(&self, realization: &Realization) -> Self {
        if realization.is_empty() {
            return self.clone();
        }

        match &**self {
            MonoType::Base(_) | MonoType::Var(_) => self.clone(),
            MonoType::Hole(item) => match item.get() {
                Hole::Filled(typ) => typ.realize(realization),
                Hole::Empty { .. } => self.clone(),
            },
            MonoType::Ref(typ) => MonoType::reference(typ.realize(realization)),
            MonoType::Tuple(vec) => {
                MonoType::tuple(vec.iter().map(|t| t.realize(realization)).collect())
            }
            MonoType::Arrow(from, to) => {
                MonoType::arrow(from.realize(realization), to.realize(realization))
            }
            MonoType::Application(name, args) => {
                let args = args.iter().map(|t| t.realize(realization)).collect::<Vec<_>>();
                realization
                    .apply(name, args.clone())
                    .unwrap_or_else(|| MonoType::application(name.clone(), args))
            }
        }
    }
}

impl Realize for Rc<TypeScheme> {
    fn realize(&self, realization: &Realization) -> Self {
        Rc::new(TypeScheme::new(
            self.names.clone(),
            self.mono.realize(realization),
        ))
    }
}

impl Realize for Rc<TypeFun> {
    fn realize(&self, realization: &Realization) -> Self {
        Rc::new(TypeFun::new(
            self.params.clone(),
            self.body.realize(realization),
        ))
    }
}

impl Realize for ValueDecl {
    fn realize(&self, realization: &Realization) -> Self {
        Self {
            kind: self.kind,
            scheme: self.scheme.realize(realization),
        }
    }
}

impl Realize for Env {
    fn realize(&self, realization: &Realization) -> Self {
        if realization.is_empty() {
            return self.clone();
        }

        Self {
            values: self
                .values
                .iter()
                .map(|(name, decl)| (name.clone(), decl.realize(realization)))
                .collect(),
            types: self
                .types
                .iter()
                .map(|(name, fun)| (name.clone(), fun.realize(realization)))
                .collect(),
            modules: self
                .modules
                .iter()
                .map(|(name, sig)| (name.clone(), sig.realize(realization)))
                .collect(),
            signatures: self
                .signatures
                .iter()
                .map(|(name, sig)| (name.clone(), Rc::new(sig.realize(realization))))
                .collect(),
        }
    }
}

impl Realize for Signature {
    fn realize(&self, realization: &Realization) -> Self {
        match self {
            Self::Structure(env) => Self::Structure(env.realize(realization)),
            Self::Functor(functor) => Self::Functor(Rc::new(functor.realize(realization))),
        }
    }
}

impl Realize for Functor {
    fn realize(&self, realization: &Realization) -> Self {
        let inner = realization.under(&self.bound);
        let realization = inner.as_ref().unwrap_or(realization);

        Self {
            bound: self.bound.clone(),
            param: self.param.realize(realization),
            result: self.result.realize(realization),
        }
    }
}

impl Realize for Existential {
    fn realize(&self, realization: &Realization) -> Self {
        let inner = realization.under(&self.bound);
        let realization = inner.as_ref().unwrap_or(realization);
        Self::new(self.bound.clone(), self.sig.realize(realization))
    }
}

impl TypeNames for Env {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        self.values.values().for_each(|d| d.scheme.type_names(names));
        self.types.values().for_each(|fun| fun.type_names(names));
        self.modules.values().for_each(|sig| sig.type_names(names));
        self.signatures.values().for_each(|sig| sig.type_names(names));
    }
}

impl TypeNames for Signature {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        match self {
            Self::Structure(env) => env.type_names(names),
            Self::Functor(functor) => functor.type_names(names),
        }
    }
}

fn without_binders(binders: &[TyName], inner: IndexSet<TyName>, names: &mut IndexSet<TyName>) {
    names.extend(inner.into_iter().filter(|name| !binders.contains(name)));
}

impl TypeNames for Functor {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        let mut inner = IndexSet::new();
        self.param.type_names(&mut inner);
        self.result.type_names(&mut inner);
        without_binders(&self.bound, inner, names);
    }
}

impl TypeNames for Existential {
    fn type_names(&self, names: &mut IndexSet<TyName>) {
        without_binders(&self.bound, self.sig.free_type_names(), names);
    }
}

/// Decides the names of the abstract types that functor applications and ascriptions produce.
pub trait Rename {
    fn name(&self) -> &'static str;

    fn rename(&self, ctx: &Ctx, existential: Existential) -> Existential;
}

/// Keeps the names the result was elaborated with. Every binding still unpacks them into fresh
/// ones, so this is enough to keep two applications apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepNames;

impl Rename for KeepNames {
    fn name(&self) -> &'static str {
        "keep"
    }

    fn rename(&self, _: &Ctx, existential: Existential) -> Existential {
        existential
    }
}

/// Gives fresh names to the binders of every result.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshNames;

impl Rename for FreshNames {
    fn name(&self) -> &'static str {
        "fresh"
    }

    fn rename(&self, ctx: &Ctx, existential: Existential) -> Existential {
        existential.refresh(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CheckOptions;
    use kestrel_tree::r#abstract::BaseType;

    fn structure_with_type(name: &str, fun: TypeFun) -> Env {
        let mut env = Env::default();
        env.insert_type(name, fun);
        env
    }

    #[test]
    fn unpacking_renames_every_binder() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let t = ctx.new_stamp("t");
        let env = structure_with_type("t", TypeFun::nominal(t.clone(), vec![]));
        let existential = Existential::new(vec![t.clone()], Signature::Structure(env));

        let (bound, sig) = existential.unpack(&ctx);
        assert_eq!(bound.len(), 1);
        assert_ne!(bound[0], t);

        let names = sig.free_type_names();
        assert!(names.contains(&bound[0]));
        assert!(!names.contains(&t));
    }

    #[test]
    fn realization_expands_type_functions() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let t = ctx.new_stamp("t");
        let typ = MonoType::arrow(
            MonoType::application(t.clone(), vec![MonoType::base(BaseType::Int)]),
            MonoType::base(BaseType::Bool),
        );

        let mut realization = Realization::default();
        let pair = TypeFun::new(
            vec!["'a".into()],
            MonoType::tuple(vec![MonoType::var("'a"), MonoType::var("'a")]),
        );
        realization.insert_fun(t, Rc::new(pair));

        assert_eq!(typ.realize(&realization).to_string(), "(int * int) -> bool");
    }

    #[test]
    fn binders_are_not_realized() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let t = ctx.new_stamp("t");
        let u = ctx.new_stamp("u");
        let env = structure_with_type("t", TypeFun::nominal(t.clone(), vec![]));
        let existential = Existential::new(vec![t.clone()], Signature::Structure(env));

        let mut realization = Realization::default();
        realization.insert_name(t.clone(), u);

        let realized = existential.realize(&realization);
        assert_eq!(realized.sig.free_type_names().into_iter().collect::<Vec<_>>(), vec![t]);
        assert!(realized.free_type_names().is_empty());
    }
}

//! Declarations. A sequence of declarations is checked left to right, each one in the scope of the
//! previous ones. A declaration outside of any group is checked in a single pass, while a
//! recursive group moves through the states of [Group]:
//!
//! - [Group::placeholders] binds every name the group introduces to a placeholder,
//! - [Placeholders::elaborate] checks every right hand side with all the placeholders in scope,
//! - [Elaborated::generalize] gives the values one shared list of quantifiers and ties each
//!   placeholder to the final scheme.
//!
//! Only the last two states annotate nodes, so every node of a group is annotated once.

use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use super::{pat::pattern_variables, Infer};
use crate::{
    annotation::Annotation,
    context::Ctx,
    env::{Env, Fragment, ValueDecl},
    signature::Signature,
    types::{MonoType, Type, TypeFun, TypeScheme},
    unify::unify,
    Result,
};

use kestrel_tree::r#abstract::{DataBind, Dec, DecKind, Expr, ModExpr, Pattern, TypeBind};

impl Ctx {
    /// Checks a sequence of declarations. Values may shadow earlier values, every other namespace
    /// refuses to rebind a name.
    pub fn check_decs(&self, decs: &[Dec]) -> Result<Fragment> {
        let mut acc = Fragment::default();

        for dec in decs {
            let fragment = self.adjoin(&acc.env).check_dec(dec)?;
            acc = acc.extend(fragment).or_else(|clash| {
                self.set_position(dec.location).error(format!(
                    "{} '{}' shadows previous binding",
                    clash.namespace, clash.name
                ))
            })?;
        }

        Ok(acc)
    }

    pub fn check_dec(&self, dec: &Dec) -> Result<Fragment> {
        let ctx = &self.set_position(dec.location);

        let fragment = match &dec.data {
            DecKind::Value(pat, expr) => ctx.check_value(pat, expr)?,

            DecKind::Type(bind) => ctx.check_type_bind(bind)?,

            DecKind::Datatype(bind) => {
                let declared = ctx.declare_datatype(bind)?;
                let constructors = ctx
                    .adjoin(&declared.env)
                    .define_constructors(bind, &declared)?;
                join(ctx, declared, constructors)?
            }

            DecKind::Module(name, module) => {
                let (bound, sig) = module.infer(ctx)?.unpack(ctx);
                Fragment::new(bound, Env::module(name.clone(), sig))
            }

            DecKind::Signature(name, sig) => {
                let sig = sig.infer(ctx)?;
                let mut env = Env::default();
                env.insert_signature(name.clone(), sig);
                Fragment::from_env(env)
            }

            DecKind::Include(module) => ctx.include(module)?,

            DecKind::Recursive(decs) => Group::new(decs)
                .placeholders(ctx)?
                .elaborate(ctx)?
                .generalize(ctx)?,
        };

        ctx.annotate(dec.id, Annotation::Dec(fragment.clone()));
        Ok(fragment)
    }

    /// `val p = e` outside of a recursive group.
    fn check_value(&self, pat: &Pattern, expr: &Expr) -> Result<Fragment> {
        let inner = self.level_up();
        let (pat_type, bindings) = pat.infer(&inner)?;
        let expr_type = expr.infer(&inner)?;
        unify(&inner.set_position(expr.location), expr_type, pat_type)?;

        let pure = self.is_pure(expr);
        let mut env = Env::default();

        for (name, decl) in bindings.values.iter() {
            let scheme = if pure {
                decl.scheme.mono.generalize(self)
            } else {
                decl.scheme.mono.restrict(self.level);
                decl.scheme.clone()
            };
            debug!("val {name} : {scheme}");
            env.insert_value(name.clone(), ValueDecl::variable(scheme));
        }

        Ok(Fragment::from_env(env))
    }

    fn check_type_bind(&self, bind: &TypeBind) -> Result<Fragment> {
        let body = bind.body.infer(&self.extend_types(&bind.params))?;
        let mut env = Env::default();
        env.insert_type(bind.name.clone(), TypeFun::new(bind.params.clone(), body));
        Ok(Fragment::from_env(env))
    }

    /// Mints the nominal name of a datatype and binds it. The constructors come later so they can
    /// mention the datatype and, in a recursive group, its siblings.
    pub(crate) fn declare_datatype(&self, bind: &DataBind) -> Result<Fragment> {
        let name = self.new_stamp(&bind.name);
        let mut env = Env::default();
        env.insert_type(
            bind.name.clone(),
            TypeFun::nominal(name.clone(), bind.params.clone()),
        );
        Ok(Fragment::new(vec![name], env))
    }

    /// Binds the constructors of a declared datatype. Each one is a scheme over the parameters of
    /// the datatype.
    pub(crate) fn define_constructors(&self, bind: &DataBind, declared: &Fragment) -> Result<Fragment> {
        let inner = self.extend_types(&bind.params);
        let result = match declared.env.types.get(&bind.name) {
            Some(fun) => fun.body.clone(),
            None => return self.error(format!("unknown type '{}'", bind.name)),
        };

        let mut env = Env::default();

        for constructor in &bind.constructors {
            let args = constructor
                .types
                .iter()
                .map(|typ| typ.infer(&inner))
                .collect::<Result<Vec<_>>>()?;

            let arity = args.len();
            let mono = MonoType::rfold_arrow(args.into_iter(), result.clone());
            let scheme = TypeScheme::new(bind.params.clone(), mono);

            if env.values.contains_key(&constructor.name) {
                return self.error(format!(
                    "duplicate definition of value '{}'",
                    constructor.name
                ));
            }

            env.insert_value(
                constructor.name.clone(),
                ValueDecl::constructor(arity, Rc::new(scheme)),
            );
        }

        Ok(Fragment::from_env(env))
    }

    fn include(&self, module: &ModExpr) -> Result<Fragment> {
        let (bound, sig) = module.infer(self)?.unpack(self);
        match sig {
            Signature::Structure(env) => Ok(Fragment::new(bound, env)),
            Signature::Functor(_) => self.error("include expects a structure signature"),
        }
    }
}

/// Union of the fragments of two members of the same scope.
fn join(ctx: &Ctx, left: Fragment, right: Fragment) -> Result<Fragment> {
    left.disjoint_union(right).or_else(|clash| {
        ctx.error(format!(
            "duplicate definition of {} '{}'",
            clash.namespace, clash.name
        ))
    })
}

/// What the first pass found out about a member of a recursive group.
enum Member<'a> {
    Value {
        dec: &'a Dec,
        pat: &'a Pattern,
        expr: &'a Expr,
        placeholders: Vec<(String, Type)>,
    },
    Datatype {
        dec: &'a Dec,
        bind: &'a DataBind,
        declared: Fragment,
    },
    Other(&'a Dec),
}

/// A recursive group before any pass.
pub struct Group<'a> {
    decs: &'a [Dec],
}

/// Every name the group introduces is bound to a placeholder.
pub struct Placeholders<'a> {
    members: Vec<Member<'a>>,
    fragment: Fragment,
}

/// Every member is checked. The values still have monomorphic types.
pub struct Elaborated<'a> {
    values: Vec<Tied<'a>>,
    fragment: Fragment,
}

struct Tied<'a> {
    dec: &'a Dec,
    pure: bool,
    bindings: Env,
    placeholders: Vec<(String, Type)>,
}

impl<'a> Group<'a> {
    pub fn new(decs: &'a [Dec]) -> Self {
        Self { decs }
    }

    /// Values get fresh holes one level deeper than `ctx` and datatypes get
    /// their nominal names. Nothing is annotated.
    pub fn placeholders(self, ctx: &Ctx) -> Result<Placeholders<'a>> {
        let inner = ctx.level_up();
        let mut members = Vec::with_capacity(self.decs.len());
        let mut fragment = Fragment::default();

        for dec in self.decs {
            let ctx = &ctx.set_position(dec.location);

            match &dec.data {
                DecKind::Value(pat, expr) => {
                    let mut names = Vec::new();
                    pattern_variables(pat, &mut names);

                    let mut env = Env::default();
                    let mut placeholders = Vec::with_capacity(names.len());

                    for name in names {
                        if env.values.contains_key(&name) {
                            return ctx.error(format!("duplicate variable '{name}' in pattern"));
                        }

                        let hole = inner.new_hole();
                        env.insert_value(name.clone(), ValueDecl::variable(hole.to_poly()));
                        placeholders.push((name, hole));
                    }

                    fragment = join(ctx, fragment, Fragment::from_env(env))?;
                    members.push(Member::Value {
                        dec,
                        pat,
                        expr,
                        placeholders,
                    });
                }

                DecKind::Datatype(bind) => {
                    let declared = ctx.declare_datatype(bind)?;
                    fragment = join(ctx, fragment, declared.clone())?;
                    members.push(Member::Datatype {
                        dec,
                        bind,
                        declared,
                    });
                }

                _ => members.push(Member::Other(dec)),
            }
        }

        Ok(Placeholders { members, fragment })
    }
}

impl<'a> Placeholders<'a> {
    /// Type definitions come first, then the constructors of the datatypes,
    /// then the rest of the declarations and finally the values, which see everything else.
    pub fn elaborate(self, ctx: &Ctx) -> Result<Elaborated<'a>> {
        let Self { members, fragment } = self;

        let mut types = Fragment::default();
        let scope = ctx.adjoin(&fragment.env);

        for member in &members {
            let Member::Other(dec) = member else { continue };
            if let DecKind::Type(bind) = &dec.data {
                let ctx = &scope.adjoin(&types.env).set_position(dec.location);
                let alias = ctx.check_type_bind(bind)?;
                ctx.annotate(dec.id, Annotation::Dec(alias.clone()));
                types = join(ctx, types, alias)?;
            }
        }

        let scope = scope.adjoin(&types.env);
        let mut constructors = Fragment::default();

        for member in &members {
            if let Member::Datatype { dec, bind, declared } = member {
                let ctx = &scope.set_position(dec.location);
                let defined = ctx.define_constructors(bind, declared)?;
                let own = Fragment::new(declared.bound.clone(), declared.env.adjoin(&defined.env));
                ctx.annotate(dec.id, Annotation::Dec(own));
                constructors = join(ctx, constructors, defined)?;
            }
        }

        let scope = scope.adjoin(&constructors.env);
        let mut others = Fragment::default();

        for member in &members {
            if let Member::Other(dec) = member {
                if !matches!(dec.data, DecKind::Type(_)) {
                    let ctx = &scope.adjoin(&others.env);
                    let checked = ctx.check_dec(dec)?;
                    others = join(&ctx.set_position(dec.location), others, checked)?;
                }
            }
        }

        let scope = scope.adjoin(&others.env).level_up();
        let mut values = Vec::new();

        for member in members {
            if let Member::Value {
                dec,
                pat,
                expr,
                placeholders,
            } = member
            {
                let ctx = &scope.set_position(dec.location);
                let (pat_type, bindings) = pat.infer(ctx)?;
                let expr_type = expr.infer(ctx)?;
                unify(&ctx.set_position(expr.location), expr_type, pat_type)?;

                for (name, placeholder) in &placeholders {
                    if let Some(decl) = bindings.values.get(name) {
                        unify(ctx, placeholder.clone(), decl.scheme.mono.clone())?;
                    }
                }

                values.push(Tied {
                    dec,
                    pure: ctx.is_pure(expr),
                    bindings,
                    placeholders,
                });
            }
        }

        let fragment = join(ctx, fragment, types)?;
        let fragment = join(ctx, fragment, constructors)?;
        let fragment = join(ctx, fragment, others)?;

        Ok(Elaborated { values, fragment })
    }
}

impl Elaborated<'_> {
    /// Generalizes the values of the group with one shared list of quantifiers. The first value
    /// decides: when it has nothing to quantify, or when some value of the group is not pure,
    /// every value of the group stays monomorphic.
    pub fn generalize(self, ctx: &Ctx) -> Result<Fragment> {
        let Self { values, fragment } = self;

        let pure = values.iter().all(|tied| tied.pure);
        let mut holes = IndexMap::new();
        let mut generalized = Vec::with_capacity(values.len());

        if pure {
            if let Some(first) = values.first() {
                for decl in first.bindings.values.values() {
                    decl.scheme.mono.generalize_type(ctx, &mut holes);
                }
            }
        }

        let polymorphic = pure && !holes.is_empty();

        for tied in &values {
            let mut env = Env::default();
            for (name, decl) in tied.bindings.values.iter() {
                let mono = if polymorphic {
                    decl.scheme.mono.generalize_type(ctx, &mut holes)
                } else {
                    decl.scheme.mono.restrict(ctx.level);
                    decl.scheme.mono.clone()
                };
                env.insert_value(name.clone(), ValueDecl::variable(mono.to_poly()));
            }
            generalized.push(env);
        }

        let names = holes.into_values().collect::<Vec<_>>();
        let mut values_env = Env::default();

        for (tied, env) in values.iter().zip(generalized) {
            let mut own = Env::default();

            for (name, decl) in env.values.iter() {
                let scheme = Rc::new(TypeScheme::new(names.clone(), decl.scheme.mono.clone()));
                debug!("rec val {name} : {scheme}");
                own.insert_value(name.clone(), ValueDecl::variable(scheme));
            }

            tie(ctx, &tied.placeholders, &own)?;
            ctx.annotate(tied.dec.id, Annotation::Dec(Fragment::from_env(own.clone())));
            values_env = values_env.adjoin(&own);
        }

        let values = Fragment::from_env(values_env);
        let fragment = Fragment::new(fragment.bound, fragment.env.adjoin(&values.env));
        Ok(fragment)
    }
}

/// Unifies each placeholder with an instance of the final scheme of its name.
fn tie(ctx: &Ctx, placeholders: &[(String, Type)], env: &Env) -> Result<()> {
    for (name, placeholder) in placeholders {
        if let Some(decl) = env.values.get(name) {
            unify(ctx, placeholder.clone(), decl.scheme.instantiate(ctx))?;
        }
    }
    Ok(())
}

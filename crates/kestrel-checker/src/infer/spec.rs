//! Elaboration of signature expressions and of the specifications inside them.

use std::rc::Rc;

use super::Infer;
use crate::{
    annotation::Annotation,
    context::Ctx,
    env::{Env, Fragment, ValueDecl},
    signature::{Existential, Functor, Realization, Realize, Signature},
    types::{TypeFun, TypeScheme},
    Result,
};

use kestrel_tree::r#abstract::{Path, SigExpr, SigKind, Spec, SpecKind, TypeNode};

impl Infer for &SigExpr {
    type Context<'a> = &'a Ctx;
    type Return = Result<Existential>;

    fn infer(self, ctx: Self::Context<'_>) -> Self::Return {
        let ctx = &ctx.set_position(self.location);

        let existential = match &self.data {
            SigKind::Path(path) => (*ctx.lookup_signature(path)?).clone(),

            SigKind::Structure(specs) => Existential::pack(ctx.check_specs(specs)?),

            SigKind::Functor(name, param, result) => {
                let (bound, param) = param.infer(ctx)?.unpack(ctx);
                let result = result.infer(&ctx.extend_module(name.clone(), param.clone()))?;
                let functor = Functor {
                    bound,
                    param,
                    result,
                };
                Existential::concrete(Signature::Functor(Rc::new(functor)))
            }

            SigKind::Refine(sig, path, params, definition) => {
                let sig = sig.infer(ctx)?;
                ctx.refine(sig, path, params, definition)?
            }
        };

        ctx.annotate(self.id, Annotation::Sig(existential.clone()));
        Ok(existential)
    }
}

impl Ctx {
    /// Checks the specifications of a signature. Unlike declarations they cannot bind the same
    /// name twice in any namespace.
    pub fn check_specs(&self, specs: &[Spec]) -> Result<Fragment> {
        let mut acc = Fragment::default();

        for spec in specs {
            let fragment = self.adjoin(&acc.env).check_spec(spec)?;
            acc = acc.disjoint_union(fragment).or_else(|clash| {
                self.set_position(spec.location).error(format!(
                    "duplicate definition of {} '{}'",
                    clash.namespace, clash.name
                ))
            })?;
        }

        Ok(acc)
    }

    fn check_spec(&self, spec: &Spec) -> Result<Fragment> {
        let ctx = &self.set_position(spec.location);

        let fragment = match &spec.data {
            SpecKind::Value(name, typ) => {
                let vars = ctx.free_type_variables(typ);
                let mono = typ.infer(&ctx.extend_types(&vars))?;
                let scheme = Rc::new(TypeScheme::new(vars, mono));

                let mut env = Env::default();
                env.insert_value(name.clone(), ValueDecl::variable(scheme));
                Fragment::from_env(env)
            }

            SpecKind::Type(name, params, None) => {
                let abstract_name = ctx.new_stamp(name);
                let mut env = Env::default();
                env.insert_type(
                    name.clone(),
                    TypeFun::nominal(abstract_name.clone(), params.clone()),
                );
                Fragment::new(vec![abstract_name], env)
            }

            SpecKind::Type(name, params, Some(definition)) => {
                let body = definition.infer(&ctx.extend_types(params))?;
                let mut env = Env::default();
                env.insert_type(name.clone(), TypeFun::new(params.clone(), body));
                Fragment::from_env(env)
            }

            SpecKind::Datatype(bind) => {
                let declared = ctx.declare_datatype(bind)?;
                let constructors = ctx
                    .adjoin(&declared.env)
                    .define_constructors(bind, &declared)?;
                Fragment::new(declared.bound, declared.env.adjoin(&constructors.env))
            }

            SpecKind::Module(name, sig) => {
                let (bound, sig) = sig.infer(ctx)?.unpack(ctx);
                Fragment::new(bound, Env::module(name.clone(), sig))
            }

            SpecKind::Include(sig) => {
                let (bound, sig) = sig.infer(ctx)?.unpack(ctx);
                match sig {
                    Signature::Structure(env) => Fragment::new(bound, env),
                    Signature::Functor(_) => {
                        return ctx.error("include expects a structure signature")
                    }
                }
            }
        };

        ctx.annotate(spec.id, Annotation::Spec(fragment.clone()));
        Ok(fragment)
    }

    /// `sig where type params path = definition`: makes the abstract type at `path` manifest.
    fn refine(
        &self,
        existential: Existential,
        path: &Path,
        params: &[String],
        definition: &TypeNode,
    ) -> Result<Existential> {
        let Signature::Structure(env) = &existential.sig else {
            return self.error(format!(
                "cannot refine '{path}': expected a structure but got a functor"
            ));
        };

        let mut scope = env.clone();
        for name in &path.qualifier {
            scope = match scope.modules.get(name) {
                Some(Signature::Structure(inner)) => inner.clone(),
                Some(Signature::Functor(_)) => {
                    return self.error(format!(
                        "cannot refine '{path}': expected a structure but got a functor"
                    ))
                }
                None => {
                    return self.error(format!("cannot refine '{path}': unknown module '{name}'"))
                }
            };
        }

        let Some(fun) = scope.types.get(&path.name) else {
            return self.error(format!("cannot refine '{path}': unknown type '{path}'"));
        };

        let Some(name) = fun
            .nominal_name()
            .filter(|name| existential.bound.contains(name))
        else {
            return self.error(format!("cannot refine '{path}': the type is not abstract"));
        };

        if fun.arity() != params.len() {
            return self.error(format!(
                "cannot refine '{path}': wrong number of type arguments: expected {}, found {}",
                fun.arity(),
                params.len()
            ));
        }

        let body = definition.infer(&self.extend_types(params))?;
        let mut realization = Realization::default();
        realization.insert_fun(name.clone(), Rc::new(TypeFun::new(params.to_vec(), body)));

        let bound = existential
            .bound
            .iter()
            .filter(|bound| *bound != name)
            .cloned()
            .collect();

        Ok(Existential::new(bound, existential.sig.realize(&realization)))
    }
}

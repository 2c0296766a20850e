//! Elaboration of module expressions into existential signatures.

use std::rc::Rc;

use log::debug;

use super::Infer;
use crate::{
    annotation::Annotation,
    context::Ctx,
    signature::{Existential, Functor, Realize, Signature},
    types::TypeNames,
    Result,
};

use kestrel_tree::r#abstract::{ModExpr, ModKind};

impl Infer for &ModExpr {
    type Context<'a> = &'a Ctx;
    type Return = Result<Existential>;

    fn infer(self, ctx: Self::Context<'_>) -> Self::Return {
        let ctx = &ctx.set_position(self.location);

        let existential = match &self.data {
            ModKind::Path(path) => Existential::concrete(ctx.lookup_module(path)?),

            ModKind::Structure(decs) => Existential::pack(ctx.check_decs(decs)?),

            ModKind::Functor(name, param, body) => {
                let (bound, param) = param.infer(ctx)?.unpack(ctx);
                let result = body.infer(&ctx.extend_module(name.clone(), param.clone()))?;
                let functor = Functor {
                    bound,
                    param,
                    result,
                };
                Existential::concrete(Signature::Functor(Rc::new(functor)))
            }

            ModKind::Application(fun, arg) => {
                let fun = fun.infer(ctx)?;
                let Signature::Functor(functor) = &fun.sig else {
                    return ctx.error("expected a functor but got a structure");
                };

                let arg = arg.infer(ctx)?;
                let realization = match ctx.sub(&arg.sig, &functor.bound, &functor.param) {
                    Ok(realization) => realization,
                    Err(why) => {
                        return ctx.error(format!("signature mismatch in functor argument: {why}"))
                    }
                };

                debug!(
                    "applying functor with {} realized names",
                    realization.len()
                );

                let result = functor.result.realize(&realization);
                let bound = fun
                    .bound
                    .iter()
                    .chain(&arg.bound)
                    .chain(&result.bound)
                    .cloned()
                    .collect();

                ctx.options()
                    .renaming
                    .rename(ctx, Existential::new(bound, result.sig))
            }

            ModKind::Annotation(module, sig) => {
                let actual = module.infer(ctx)?;
                let stated = sig.infer(ctx)?;

                if let Err(why) = ctx.sub(&actual.sig, &stated.bound, &stated.sig) {
                    return ctx.error(format!("signature mismatch in ascription: {why}"));
                }

                ctx.options().renaming.rename(ctx, stated)
            }

            ModKind::Let(decs, body) => {
                let fragment = ctx.check_decs(decs)?;
                let result = body.infer(&ctx.adjoin(&fragment.env))?;
                ctx.check_escape(&fragment.bound, &result.free_type_names())?;
                result
            }
        };

        ctx.annotate(self.id, Annotation::Module(existential.clone()));
        Ok(existential)
    }
}

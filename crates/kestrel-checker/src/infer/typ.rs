//! Elaboration of the types written in annotations, definitions and specifications.

use indexmap::IndexSet;

use super::Infer;
use crate::{
    context::Ctx,
    types::{MonoType, Type},
    Result,
};

use kestrel_tree::r#abstract::{TypeKind, TypeNode};

impl Infer for &TypeNode {
    type Context<'a> = &'a Ctx;
    type Return = Result<Type>;

    fn infer(self, ctx: Self::Context<'_>) -> Self::Return {
        let ctx = &ctx.set_position(self.location);

        match &self.data {
            TypeKind::Base(base) => Ok(MonoType::base(*base)),

            TypeKind::Variable(name) => match ctx.env.types.get(name) {
                Some(fun) if fun.arity() == 0 => Ok(fun.apply(vec![])),
                Some(fun) => ctx.error(format!(
                    "wrong number of type arguments for '{name}': expected {}, found 0",
                    fun.arity()
                )),
                None => ctx.error(format!("unknown type '{name}'")),
            },

            TypeKind::Constructor(path, args) => {
                let fun = ctx.lookup_type(path)?;

                if fun.arity() != args.len() {
                    return ctx.error(format!(
                        "wrong number of type arguments for '{path}': expected {}, found {}",
                        fun.arity(),
                        args.len()
                    ));
                }

                let args = args
                    .iter()
                    .map(|arg| arg.infer(ctx))
                    .collect::<Result<Vec<_>>>()?;

                Ok(fun.apply(args))
            }

            TypeKind::Ref(typ) => typ.infer(ctx).map(MonoType::reference),

            TypeKind::Tuple(types) => types
                .iter()
                .map(|typ| typ.infer(ctx))
                .collect::<Result<Vec<_>>>()
                .map(MonoType::tuple),

            TypeKind::Arrow(from, to) => {
                let from = from.infer(ctx)?;
                let to = to.infer(ctx)?;
                Ok(MonoType::arrow(from, to))
            }
        }
    }
}

impl Ctx {
    /// Type variables of `typ` that are not bound in the context, in order of appearance.
    pub fn free_type_variables(&self, typ: &TypeNode) -> Vec<String> {
        fn collect(ctx: &Ctx, typ: &TypeNode, vars: &mut IndexSet<String>) {
            match &typ.data {
                TypeKind::Base(_) => {}
                TypeKind::Variable(name) => {
                    if !ctx.env.types.contains_key(name) {
                        vars.insert(name.clone());
                    }
                }
                TypeKind::Constructor(_, args) | TypeKind::Tuple(args) => {
                    args.iter().for_each(|arg| collect(ctx, arg, vars));
                }
                TypeKind::Ref(typ) => collect(ctx, typ, vars),
                TypeKind::Arrow(from, to) => {
                    collect(ctx, from, vars);
                    collect(ctx, to, vars);
                }
            }
        }

        let mut vars = IndexSet::new();
        collect(self, typ, &mut vars);
        vars.into_iter().collect()
    }
}

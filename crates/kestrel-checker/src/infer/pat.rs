//! Type inference for patterns. A pattern produces its type and the values it binds.

use super::Infer;
use crate::{
    annotation::Annotation,
    context::Ctx,
    env::{Env, ValueDecl},
    types::{MonoType, Type},
    unify::unify,
    Result,
};

use kestrel_tree::r#abstract::{Pattern, PatternKind};

impl Ctx {
    fn merge_bindings(&self, left: Env, right: Env) -> Result<Env> {
        left.disjoint_union(&right)
            .or_else(|clash| self.error(format!("duplicate variable '{}' in pattern", clash.name)))
    }

    fn infer_patterns(&self, pats: &[Pattern]) -> Result<(Vec<Type>, Env)> {
        let mut types = Vec::with_capacity(pats.len());
        let mut bindings = Env::default();

        for pat in pats {
            let (typ, env) = pat.infer(self)?;
            types.push(typ);
            bindings = self.merge_bindings(bindings, env)?;
        }

        Ok((types, bindings))
    }
}

impl Infer for &Pattern {
    type Context<'a> = &'a Ctx;
    type Return = Result<(Type, Env)>;

    fn infer(self, ctx: Self::Context<'_>) -> Self::Return {
        let ctx = &ctx.set_position(self.location);

        let (typ, bindings) = match &self.data {
            PatternKind::Wildcard => (ctx.new_hole(), Env::default()),

            PatternKind::Variable(x) => {
                let hole = ctx.new_hole();
                let mut bindings = Env::default();
                bindings.insert_value(x.clone(), ValueDecl::variable(hole.to_poly()));
                (hole, bindings)
            }

            PatternKind::Literal(literal) => (MonoType::base(literal.base()), Env::default()),

            PatternKind::Constructor(path, args) => {
                let (arity, decl) = ctx.lookup_constructor(path)?;

                if arity != args.len() {
                    return ctx.error(format!(
                        "constructor '{path}' expects {arity} arguments, but got {}",
                        args.len()
                    ));
                }

                let (types, bindings) = ctx.infer_patterns(args)?;
                let ret = ctx.new_hole();
                let expected = MonoType::rfold_arrow(types.into_iter(), ret.clone());
                unify(ctx, decl.scheme.instantiate(ctx), expected)?;

                (ret, bindings)
            }

            PatternKind::Ref(pat) => {
                let (typ, bindings) = pat.infer(ctx)?;
                (MonoType::reference(typ), bindings)
            }

            PatternKind::Tuple(pats) => {
                let (types, bindings) = ctx.infer_patterns(pats)?;
                (MonoType::tuple(types), bindings)
            }

            PatternKind::Annotation(pat, typ) => {
                let (found, bindings) = pat.infer(ctx)?;
                let stated = typ.infer(ctx)?;
                unify(ctx, found, stated.clone())?;
                (stated, bindings)
            }
        };

        ctx.annotate(self.id, Annotation::Pattern(typ.clone()));
        Ok((typ, bindings))
    }
}

/// The names a pattern binds, found without checking it.
pub fn pattern_variables(pat: &Pattern, names: &mut Vec<String>) {
    match &pat.data {
        PatternKind::Wildcard | PatternKind::Literal(_) => {}
        PatternKind::Variable(x) => names.push(x.clone()),
        PatternKind::Constructor(_, pats) | PatternKind::Tuple(pats) => {
            pats.iter().for_each(|p| pattern_variables(p, names));
        }
        PatternKind::Ref(pat) | PatternKind::Annotation(pat, _) => pattern_variables(pat, names),
    }
}

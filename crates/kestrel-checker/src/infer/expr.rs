//! Type inference for expressions.

use indexmap::IndexSet;

use super::Infer;
use crate::{
    annotation::Annotation,
    context::Ctx,
    env::ValueKind,
    types::{Class, MonoType, TyName, Type, TypeNames},
    unify::unify,
    Result,
};

use kestrel_tree::r#abstract::{BaseType, BinaryOp, Expr, ExprKind, UnaryOp};

fn unary_class(op: UnaryOp) -> Class {
    match op {
        UnaryOp::Negate => Class::Numeric,
        UnaryOp::Not => Class::Boolean,
    }
}

/// The class of the operands of a binary operator and whether the result is a boolean.
fn binary_class(op: BinaryOp) -> (Class, bool) {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => (Class::Numeric, false),
        BinaryOp::Concat => (Class::Textual, false),
        BinaryOp::Eq | BinaryOp::Ne => (Class::Equality, true),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (Class::Ordered, true),
        BinaryOp::And | BinaryOp::Or => (Class::Boolean, true),
    }
}

impl Infer for &Expr {
    type Context<'a> = &'a Ctx;
    type Return = Result<Type>;

    fn infer(self, ctx: Self::Context<'_>) -> Self::Return {
        let ctx = &ctx.set_position(self.location);

        let typ = match &self.data {
            ExprKind::Literal(literal) => MonoType::base(literal.base()),

            ExprKind::Variable(path) => ctx.lookup_value(path)?.scheme.instantiate(ctx),

            ExprKind::Constructor(path) => ctx.lookup_constructor(path)?.1.scheme.instantiate(ctx),

            ExprKind::Unary(op, expr) => {
                let typ = expr.infer(ctx)?;
                unify(ctx, typ.clone(), ctx.new_class_hole(unary_class(*op)))?;
                typ
            }

            ExprKind::Binary(op, left, right) => {
                let (class, boolean) = binary_class(*op);
                let left = left.infer(ctx)?;
                let right = right.infer(ctx)?;

                unify(ctx, left.clone(), right)?;
                unify(ctx, left.clone(), ctx.new_class_hole(class))?;

                if boolean {
                    MonoType::base(BaseType::Bool)
                } else {
                    left
                }
            }

            ExprKind::Ref(expr) => MonoType::reference(expr.infer(ctx)?),

            ExprKind::Deref(expr) => {
                let typ = expr.infer(ctx)?;
                let content = ctx.new_hole();
                unify(ctx, typ, MonoType::reference(content.clone()))?;
                content
            }

            ExprKind::Assign(target, value) => {
                let target = target.infer(ctx)?;
                let value = value.infer(ctx)?;
                unify(ctx, target, MonoType::reference(value))?;
                MonoType::base(BaseType::Unit)
            }

            ExprKind::Tuple(exprs) => MonoType::tuple(
                exprs
                    .iter()
                    .map(|expr| expr.infer(ctx))
                    .collect::<Result<Vec<_>>>()?,
            ),

            ExprKind::Function(pat, body) => {
                let (param, bindings) = pat.infer(ctx)?;
                let body = body.infer(&ctx.adjoin(&bindings))?;
                MonoType::arrow(param, body)
            }

            ExprKind::Application(fun, arg) => {
                let fun = fun.infer(ctx)?;
                let arg = arg.infer(ctx)?;

                let ret = ctx.new_hole();
                unify(ctx, fun, MonoType::arrow(arg, ret.clone()))?;
                ret
            }

            ExprKind::Annotation(expr, typ) => {
                let stated = typ.infer(ctx)?;
                let found = expr.infer(ctx)?;
                unify(ctx, found, stated.clone())?;
                stated
            }

            ExprKind::If(cond, then, otherwise) => {
                let cond = cond.infer(ctx)?;
                unify(ctx, cond, MonoType::base(BaseType::Bool))?;

                let then = then.infer(ctx)?;
                let otherwise = otherwise.infer(ctx)?;
                unify(ctx, then.clone(), otherwise)?;
                then
            }

            ExprKind::Match(scrutinee, clauses) => {
                let scrutinee = scrutinee.infer(ctx)?;
                let ret = ctx.new_hole();

                for clause in clauses {
                    let (pat, bindings) = clause.pat.infer(ctx)?;
                    unify(&ctx.set_position(clause.pat.location), scrutinee.clone(), pat)?;

                    let body = clause.expr.infer(&ctx.adjoin(&bindings))?;
                    unify(&ctx.set_position(clause.expr.location), ret.clone(), body)?;
                }

                ret
            }

            ExprKind::Let(decs, body) => {
                let fragment = ctx.check_decs(decs)?;
                let typ = body.infer(&ctx.adjoin(&fragment.env))?;
                ctx.check_escape(&fragment.bound, &typ.free_type_names())?;
                typ
            }
        };

        ctx.annotate(self.id, Annotation::Expr(typ.clone()));
        Ok(typ)
    }
}

impl Ctx {
    /// Fails if one of the names introduced locally appears in what leaves the local scope.
    pub fn check_escape(
        &self,
        local: &[TyName],
        leaving: &IndexSet<TyName>,
    ) -> Result<()> {
        match local.iter().find(|name| leaving.contains(*name)) {
            Some(name) => self.error(format!("type '{name}' escapes its scope")),
            None => Ok(()),
        }
    }

    /// Syntactic values: expressions whose evaluation cannot allocate a reference, so their type
    /// can be generalized.
    pub fn is_pure(&self, expr: &Expr) -> bool {
        match &expr.data {
            ExprKind::Literal(_)
            | ExprKind::Variable(_)
            | ExprKind::Constructor(_)
            | ExprKind::Function(..) => true,

            ExprKind::Tuple(exprs) => exprs.iter().all(|e| self.is_pure(e)),

            ExprKind::Annotation(expr, _) => self.is_pure(expr),

            ExprKind::If(cond, then, otherwise) => {
                self.is_pure(cond) && self.is_pure(then) && self.is_pure(otherwise)
            }

            ExprKind::Match(scrutinee, clauses) => {
                self.is_pure(scrutinee) && clauses.iter().all(|c| self.is_pure(&c.expr))
            }

            ExprKind::Application(..) => self.is_constructed(expr, 0),

            _ => false,
        }
    }

    /// A constructor applied to exactly as many pure arguments as it takes.
    fn is_constructed(&self, expr: &Expr, applied: usize) -> bool {
        match &expr.data {
            ExprKind::Application(fun, arg) => {
                self.is_pure(arg) && self.is_constructed(fun, applied + 1)
            }
            ExprKind::Constructor(path) => matches!(
                self.lookup_value(path).map(|decl| decl.kind),
                Ok(ValueKind::Constructor(arity)) if arity == applied
            ),
            _ => false,
        }
    }
}

//! Signature matching: deciding whether a module with some signature can be used where another
//! signature is expected, and discovering how the abstract types of the expected signature are
//! realized by the actual one.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::{
    context::Ctx,
    env::{Env, ValueKind},
    signature::{Realization, Realize, Signature},
    types::{MonoType, TyName, Type},
    unify::unify_types,
};

fn qualified(path: &[String], name: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(".")
}

impl Ctx {
    /// Matches `actual` against `expected` where the names in `bound` are the abstract types of
    /// `expected`. On success, returns the realization of those names that makes `actual` an
    /// instance of `expected`. The error explains the first mismatch found.
    pub fn sub(
        &self,
        actual: &Signature,
        bound: &[TyName],
        expected: &Signature,
    ) -> Result<Realization, String> {
        let mut realization = Realization::default();
        let mut path = Vec::new();
        discover(actual, bound, expected, &mut path, &mut realization)?;

        let expected = expected.realize(&realization);
        self.enrich(actual, &expected, &mut path)?;

        Ok(realization)
    }

    /// Checks that `actual` has at least every component of `expected` at a type that is at least
    /// as general.
    fn enrich(
        &self,
        actual: &Signature,
        expected: &Signature,
        path: &mut Vec<String>,
    ) -> Result<(), String> {
        match (actual, expected) {
            (Signature::Structure(actual), Signature::Structure(expected)) => {
                self.enrich_values(actual, expected, path)?;
                self.enrich_types(actual, expected, path)?;

                for (name, sig) in expected.modules.iter() {
                    let Some(found) = actual.modules.get(name) else {
                        return Err(format!("missing module '{}'", qualified(path, name)));
                    };
                    path.push(name.clone());
                    self.enrich(found, sig, path)?;
                    path.pop();
                }

                // Signature definitions only take part when the expected side lists some.
                for name in expected.signatures.keys() {
                    if !actual.signatures.contains_key(name) {
                        return Err(format!("missing signature '{}'", qualified(path, name)));
                    }
                }

                Ok(())
            }

            (Signature::Functor(actual), Signature::Functor(expected)) => {
                let realization = self
                    .sub(&expected.param, &actual.bound, &actual.param)
                    .map_err(|why| format!("functor parameters do not match: {why}"))?;

                let (_, result) = actual.result.realize(&realization).unpack(self);
                self.sub(&result, &expected.result.bound, &expected.result.sig)
                    .map_err(|why| format!("functor results do not match: {why}"))?;

                Ok(())
            }

            (actual, expected) => Err(format!(
                "expected {} but got {}",
                expected.shape(),
                actual.shape()
            )),
        }
    }

    fn enrich_values(&self, actual: &Env, expected: &Env, path: &[String]) -> Result<(), String> {
        for (name, spec) in expected.values.iter() {
            let shown = qualified(path, name);
            let Some(decl) = actual.values.get(name) else {
                return Err(format!("missing value '{shown}'"));
            };

            if let ValueKind::Constructor(arity) = spec.kind {
                match decl.kind {
                    ValueKind::Constructor(found) if found == arity => {}
                    ValueKind::Constructor(found) => {
                        return Err(format!(
                            "constructor '{shown}' expects {found} arguments, but the signature \
                             requires {arity}"
                        ))
                    }
                    ValueKind::Variable => return Err(format!("'{shown}' is not a constructor")),
                }
            }

            let mismatch = format!(
                "value '{shown}' has type '{}' but the signature requires '{}'",
                decl.scheme, spec.scheme
            );

            // A hole that is still open in the actual value is monomorphic, so it cannot stand
            // for a quantified variable of the specification.
            let mut open = IndexSet::new();
            decl.scheme.mono.empty_holes(&mut open);

            let required = spec.scheme.skolemize(self);
            let found = decl.scheme.instantiate(self);

            if unify_types(found, required).is_err() {
                return Err(mismatch);
            }

            let escaped = open
                .iter()
                .any(|hole| MonoType::Hole(hole.clone()).has_rigid_vars());

            if escaped {
                return Err(mismatch);
            }
        }

        Ok(())
    }

    fn enrich_types(&self, actual: &Env, expected: &Env, path: &[String]) -> Result<(), String> {
        for (name, spec) in expected.types.iter() {
            let shown = qualified(path, name);
            let Some(found) = actual.types.get(name) else {
                return Err(format!("missing type '{shown}'"));
            };

            if found.arity() != spec.arity() {
                return Err(format!(
                    "type '{shown}' takes {} arguments but the signature requires {}",
                    found.arity(),
                    spec.arity()
                ));
            }

            let args: Vec<Type> = (0..spec.arity())
                .map(|_| MonoType::var(self.new_name()))
                .collect();

            if unify_types(found.apply(args.clone()), spec.apply(args)).is_err() {
                return Err(format!(
                    "type '{shown}' is '{found}' but the signature requires '{spec}'"
                ));
            }
        }

        Ok(())
    }
}

/// Finds, for every abstract type of `expected`, the definition `actual` gives to the type at the
/// same path.
fn discover(
    actual: &Signature,
    bound: &[TyName],
    expected: &Signature,
    path: &mut Vec<String>,
    realization: &mut Realization,
) -> Result<(), String> {
    let (Signature::Structure(actual), Signature::Structure(expected)) = (actual, expected) else {
        return Ok(());
    };

    for (name, spec) in expected.types.iter() {
        let Some(abstract_name) = spec.nominal_name() else {
            continue;
        };

        if !bound.contains(abstract_name) || realization.contains(abstract_name) {
            continue;
        }

        let Some(found) = actual.types.get(name) else {
            return Err(format!("missing type '{}'", qualified(path, name)));
        };

        if found.arity() != spec.arity() {
            return Err(format!(
                "type '{}' takes {} arguments but the signature requires {}",
                qualified(path, name),
                found.arity(),
                spec.arity()
            ));
        }

        realization.insert_fun(abstract_name.clone(), Rc::clone(found));
    }

    for (name, sig) in expected.modules.iter() {
        if let Some(found) = actual.modules.get(name) {
            path.push(name.clone());
            discover(found, bound, sig, path, realization)?;
            path.pop();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::CheckOptions, env::ValueDecl, types::TypeFun};
    use kestrel_tree::r#abstract::BaseType;

    fn ctx() -> Ctx {
        Ctx::new(Env::default(), CheckOptions::default())
    }

    #[test]
    fn abstract_types_are_realized_by_the_actual_definition() {
        let ctx = ctx();
        let t = ctx.new_stamp("t");

        let mut expected = Env::default();
        expected.insert_type("t", TypeFun::nominal(t.clone(), vec![]));
        let arrow = MonoType::arrow(
            MonoType::application(t.clone(), vec![]),
            MonoType::base(BaseType::Int),
        );
        expected.insert_value("get", ValueDecl::variable(arrow.to_poly()));

        let mut actual = Env::default();
        actual.insert_type("t", TypeFun::new(vec![], MonoType::base(BaseType::Int)));
        let identity = MonoType::arrow(MonoType::var("'x"), MonoType::var("'x"));
        actual.insert_value(
            "get",
            ValueDecl::variable(Rc::new(crate::types::TypeScheme::new(
                vec!["'x".into()],
                identity,
            ))),
        );
        actual.insert_value("extra", ValueDecl::variable(MonoType::base(BaseType::Unit).to_poly()));

        let realization = ctx
            .sub(
                &Signature::Structure(actual),
                &[t.clone()],
                &Signature::Structure(expected),
            )
            .unwrap();

        assert_eq!(realization.len(), 1);
        assert!(realization.contains(&t));
    }

    #[test]
    fn less_general_values_do_not_match() {
        let ctx = ctx();

        let mut expected = Env::default();
        let identity = MonoType::arrow(MonoType::var("'x"), MonoType::var("'x"));
        expected.insert_value(
            "id",
            ValueDecl::variable(Rc::new(crate::types::TypeScheme::new(
                vec!["'x".into()],
                identity,
            ))),
        );

        let mut actual = Env::default();
        let int = MonoType::arrow(MonoType::base(BaseType::Int), MonoType::base(BaseType::Int));
        actual.insert_value("id", ValueDecl::variable(int.to_poly()));

        let why = ctx
            .sub(&Signature::Structure(actual), &[], &Signature::Structure(expected))
            .unwrap_err();
        assert!(why.starts_with("value 'id' has type"), "{why}");
    }

    #[test]
    fn shapes_must_agree() {
        let ctx = ctx();
        let functor = Signature::Functor(Rc::new(crate::signature::Functor {
            bound: vec![],
            param: Signature::Structure(Env::default()),
            result: crate::signature::Existential::concrete(Signature::Structure(Env::default())),
        }));

        let why = ctx
            .sub(&functor, &[], &Signature::Structure(Env::default()))
            .unwrap_err();
        assert_eq!(why, "expected a structure but got a functor");
    }
}

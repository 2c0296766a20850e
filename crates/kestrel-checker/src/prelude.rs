//! The environment every program starts with. It is described by three tables and built once per
//! thread: the type constructors, the primitive values given by a literal and the constructors of
//! the prelude datatypes.

use std::rc::Rc;

use kestrel_tree::r#abstract::{BaseType, Literal};

use crate::{
    env::{Env, ValueDecl},
    types::{MonoType, TyName, Type, TypeFun, TypeScheme},
};

enum Prim {
    Base(BaseType),
    /// A datatype of the prelude and its parameters.
    Nominal(&'static [&'static str]),
}

const TYPES: &[(&str, Prim)] = &[
    ("unit", Prim::Base(BaseType::Unit)),
    ("bool", Prim::Base(BaseType::Bool)),
    ("int", Prim::Base(BaseType::Int)),
    ("float", Prim::Base(BaseType::Float)),
    ("char", Prim::Base(BaseType::Char)),
    ("string", Prim::Base(BaseType::Text)),
    ("list", Prim::Nominal(&["'a"])),
    ("option", Prim::Nominal(&["'a"])),
];

fn values() -> [(&'static str, Literal); 4] {
    [
        ("max_int", Literal::Int(i64::MAX)),
        ("min_int", Literal::Int(i64::MIN)),
        ("pi", Literal::Float(std::f64::consts::PI)),
        ("newline", Literal::Char('\n')),
    ]
}

/// `(name, arguments, result)` where the types may mention the datatype parameter `'a`.
fn constructors() -> Vec<(&'static str, Vec<Type>, Type)> {
    let a = || MonoType::var("'a");
    let list = MonoType::application(TyName::prelude("list"), vec![a()]);
    let option = MonoType::application(TyName::prelude("option"), vec![a()]);
    vec![
        ("Nil", vec![], list.clone()),
        ("Cons", vec![a(), list.clone()], list),
        ("None", vec![], option.clone()),
        ("Some", vec![a()], option),
    ]
}

fn build() -> Env {
    let mut env = Env::default();

    for (name, prim) in TYPES {
        let fun = match prim {
            Prim::Base(base) => TypeFun::new(vec![], MonoType::base(*base)),
            Prim::Nominal(params) => TypeFun::nominal(
                TyName::prelude(*name),
                params.iter().map(|p| p.to_string()).collect(),
            ),
        };
        env.insert_type(*name, fun);
    }

    for (name, literal) in values() {
        let typ = MonoType::base(literal.base());
        env.insert_value(name, ValueDecl::variable(typ.to_poly()));
    }

    for (name, args, result) in constructors() {
        let arity = args.len();
        let mono = MonoType::rfold_arrow(args.into_iter(), result);
        let scheme = TypeScheme::new(vec!["'a".to_string()], mono);
        env.insert_value(name, ValueDecl::constructor(arity, Rc::new(scheme)));
    }

    env
}

thread_local! {
    static PRELUDE: Env = build();
}

/// The prelude environment. Its nominal types carry stamp `0`.
pub fn prelude() -> Env {
    PRELUDE.with(Env::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_are_polymorphic() {
        let env = prelude();
        let cons = &env.values["Cons"];
        assert_eq!(cons.scheme.to_string(), "forall 'a. 'a -> 'a list -> 'a list");
        assert!(cons.is_constructor());
        assert_eq!(env.values["None"].scheme.to_string(), "forall 'a. 'a option");
    }

    #[test]
    fn base_types_are_aliases() {
        let env = prelude();
        assert_eq!(env.types["string"].body.to_string(), "string");
        assert_eq!(env.types["list"].nominal_name(), Some(&TyName::prelude("list")));
        assert_eq!(env.values["pi"].scheme.to_string(), "float");
    }
}

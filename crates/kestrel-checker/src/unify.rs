//! This module exposes [unify] and [occur_check] that are used by the checker to force two types to
//! be "equal". These functions produce side effects: holes get filled and their levels adjusted.

use std::{fmt::Display, rc::Rc};

use crate::{
    context::Ctx,
    types::{Class, Hole, MonoType, Ref, Type},
    Result,
};

#[derive(Debug)]
pub struct OccursCheck;

impl Display for OccursCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "found cyclic type of infinite size")
    }
}

/// The reason two types do not unify, pointing at the innermost subterms that disagree.
#[derive(Debug)]
pub enum UnifyError {
    Mismatch(Type, Type),
    NotInClass(Class, Type),
    Classes(Class, Class),
    Occurs(OccursCheck),
}

/// Tries to find a most general unifier for two types and reports a located error otherwise.
pub fn unify(ctx: &Ctx, left: Type, right: Type) -> Result<()> {
    let Err(err) = unify_types(left.clone(), right.clone()) else {
        return Ok(());
    };

    let header = format!("type mismatch between '{}' and '{}'", left, right);

    let because = match err {
        UnifyError::Occurs(occurs) => return ctx.error(occurs.to_string()),
        UnifyError::Mismatch(l, r) => {
            let (l, r) = (l.to_string(), r.to_string());
            let top = (left.to_string(), right.to_string());
            (top != (l.clone(), r.clone()) && top != (r.clone(), l.clone()))
                .then(|| format!("'{l}' and '{r}' are incompatible"))
        }
        UnifyError::NotInClass(class, typ) => Some(format!("'{typ}' is not a {class} type")),
        UnifyError::Classes(a, b) => Some(format!("{a} and {b} types are incompatible")),
    };

    match because {
        Some(because) => ctx.error(format!("{header}\n  because {because}")),
        None => ctx.error(header),
    }
}

/// Unifies two types without reporting, the building block of [unify].
pub fn unify_types(left: Type, right: Type) -> std::result::Result<(), UnifyError> {
    if Rc::ptr_eq(&left, &right) {
        return Ok(());
    }

    match (&*left, &*right) {
        (MonoType::Hole(l), MonoType::Hole(r)) if l == r => Ok(()),

        (MonoType::Hole(hole), _) => unify_hole(hole, right.clone(), false),

        (_, MonoType::Hole(hole)) => unify_hole(hole, left.clone(), true),

        (MonoType::Base(x), MonoType::Base(y)) if x == y => Ok(()),

        (MonoType::Var(x), MonoType::Var(y)) if x == y => Ok(()),

        (MonoType::Ref(l), MonoType::Ref(r)) => unify_types(l.clone(), r.clone()),

        (MonoType::Arrow(l, r), MonoType::Arrow(l1, r1)) => {
            unify_types(l.clone(), l1.clone())?;
            unify_types(r.clone(), r1.clone())
        }

        (MonoType::Tuple(vec_l), MonoType::Tuple(vec_r)) if vec_l.len() == vec_r.len() => {
            for (l, r) in vec_l.iter().zip(vec_r.iter()) {
                unify_types(l.clone(), r.clone())?;
            }
            Ok(())
        }

        (MonoType::Application(n, args_l), MonoType::Application(m, args_r))
            if n == m && args_l.len() == args_r.len() =>
        {
            for (l, r) in args_l.iter().zip(args_r.iter()) {
                unify_types(l.clone(), r.clone())?;
            }
            Ok(())
        }

        _ => Err(UnifyError::Mismatch(left, right)),
    }
}

/// Unifies a hole with a type. `swap` tells that the hole was on the right side, so a filled hole
/// is compared keeping the order the caller used.
fn unify_hole(hole: &Ref, other: Type, swap: bool) -> std::result::Result<(), UnifyError> {
    let (level, class) = match hole.get() {
        Hole::Filled(filled) if swap => return unify_types(other, filled),
        Hole::Filled(filled) => return unify_types(filled, other),
        Hole::Empty { level, class } => (level, class),
    };

    let other = other.flatten();

    if let MonoType::Hole(other_hole) = &*other {
        if other_hole == hole {
            return Ok(());
        }

        if let Hole::Empty {
            level: other_level,
            class: other_class,
        } = other_hole.get()
        {
            let class = match (class, other_class) {
                (None, class) | (class, None) => class,
                (Some(a), Some(b)) => Some(a.meet(b).ok_or(UnifyError::Classes(a, b))?),
            };

            other_hole.get_item_mut().data = Hole::Empty {
                level: usize::min(level, other_level),
                class,
            };

            hole.fill(other);
            return Ok(());
        }
    }

    match (class, &*other) {
        (Some(class), MonoType::Base(base)) if class.admits(*base) => {
            hole.fill(other);
            Ok(())
        }

        (Some(class), _) => Err(UnifyError::NotInClass(class, other)),

        (None, _) => {
            occur_check(hole, level, other.clone()).map_err(UnifyError::Occurs)?;
            hole.fill(other);
            Ok(())
        }
    }
}

/// Checks if a hole occurs inside a type, which would make the type infinite. It also lowers the
/// level of every empty hole found to the level of the one being filled, so that they stay in the
/// region of the outermost binder that can see them.
pub fn occur_check(hole: &Ref, lvl: usize, other: Type) -> std::result::Result<(), OccursCheck> {
    match &*other {
        MonoType::Hole(other_hole) if hole == other_hole => return Err(OccursCheck),

        MonoType::Hole(other_hole) => match other_hole.get() {
            Hole::Empty { level, class } => {
                other_hole.get_item_mut().data = Hole::Empty {
                    level: usize::min(lvl, level),
                    class,
                };
            }

            Hole::Filled(filled) => occur_check(hole, lvl, filled)?,
        },

        MonoType::Ref(typ) => occur_check(hole, lvl, typ.clone())?,

        MonoType::Tuple(vec) | MonoType::Application(_, vec) => {
            for mono in vec {
                occur_check(hole, lvl, mono.clone())?;
            }
        }

        MonoType::Arrow(l, r) => {
            occur_check(hole, lvl, l.clone())?;
            occur_check(hole, lvl, r.clone())?;
        }

        MonoType::Base(_) | MonoType::Var(_) => {}
    }

    Ok(())
}

//! The context is the left side of every judgment of the checker: the environment in scope, where
//! in the source we are and how deep inside generalizable bindings we are. Everything that must
//! outlive a single judgment (counters, annotations and operator holes) lives in the [Session]
//! shared by every context derived from the same root.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use kestrel_error::Error;
use kestrel_location::{ByteRange, NodeId};
use log::debug;

use crate::{
    annotation::{Annotation, Annotations},
    env::Env,
    signature::{KeepNames, Rename, Signature},
    types::{Class, Hole, MonoType, Ref, TyName, Type, TypeFun},
    Result,
};

/// Knobs of a checking session.
#[derive(Clone)]
pub struct CheckOptions {
    /// How the result of functor applications and ascriptions is renamed.
    pub renaming: Rc<dyn Rename>,
    /// Resolve operator placeholders to their default types once the program is checked.
    pub default_classes: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            renaming: Rc::new(KeepNames),
            default_classes: true,
        }
    }
}

impl fmt::Debug for CheckOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckOptions")
            .field("renaming", &self.renaming.name())
            .field("default_classes", &self.default_classes)
            .finish()
    }
}

/// State shared by every context of one checking run.
#[derive(Debug, Default)]
pub struct Session {
    counter: Cell<usize>,
    stamps: Cell<usize>,
    classes: RefCell<Vec<Ref>>,
    annotations: RefCell<Annotations>,
    options: CheckOptions,
}

impl Session {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub env: Env,
    pub location: ByteRange,
    pub level: usize,
    session: Rc<Session>,
}

impl Ctx {
    pub fn new(env: Env, options: CheckOptions) -> Self {
        Self {
            env,
            location: ByteRange::default(),
            level: 0,
            session: Rc::new(Session::new(options)),
        }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.session.options
    }

    /// Extends the context with the bindings of `env`, which override the ones in scope.
    pub fn adjoin(&self, env: &Env) -> Self {
        Self {
            env: self.env.adjoin(env),
            ..self.clone()
        }
    }

    pub fn extend_module(&self, name: impl Into<String>, sig: Signature) -> Self {
        Self {
            env: Env {
                modules: self.env.modules.update(name.into(), sig),
                ..self.env.clone()
            },
            ..self.clone()
        }
    }

    /// Extends a context with a list of type variables, each one standing for itself.
    pub fn extend_types(&self, names: &[String]) -> Self {
        let mut types = self.env.types.clone();
        for name in names {
            let fun = TypeFun::new(vec![], MonoType::var(name.clone()));
            types.insert(name.clone(), Rc::new(fun));
        }

        Self {
            env: Env {
                types,
                ..self.env.clone()
            },
            ..self.clone()
        }
    }

    /// Increase the level of the context, so it measures where we are inside the forall bindings.
    /// It only increases around value bindings because they are the only construction that can
    /// be generalized.
    pub fn level_up(&self) -> Self {
        Self {
            level: self.level + 1,
            ..self.clone()
        }
    }

    /// Sets the current location that we are type checking inside of the context.
    pub fn set_position(&self, location: ByteRange) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }

    /// Creates a new name for a type variable.
    pub fn new_name(&self) -> String {
        fn letters(mut x: usize) -> String {
            let mut result = vec![];
            loop {
                result.push(char::from(b'a' + (x % 26) as u8));
                x /= 26;
                if x == 0 {
                    break;
                }
                x -= 1;
            }
            result.into_iter().rev().collect()
        }

        let count = self.session.counter.get();
        self.session.counter.set(count + 1);
        format!("'{}", letters(count))
    }

    /// Mints a fresh nominal name. Stamp `0` is reserved for the prelude.
    pub fn new_stamp(&self, name: &str) -> TyName {
        let stamp = self.session.stamps.get() + 1;
        self.session.stamps.set(stamp);
        TyName::new(name, stamp)
    }

    /// Creates a new hole type.
    pub fn new_hole(&self) -> Type {
        MonoType::new_hole(self.new_name(), self.level, None)
    }

    /// Creates a hole that only accepts the base types of `class`. It is remembered by the session
    /// so it can be defaulted when the program ends.
    pub fn new_class_hole(&self, class: Class) -> Type {
        let typ = MonoType::new_hole(self.new_name(), self.level, Some(class));
        if let MonoType::Hole(hole) = &*typ {
            self.session.classes.borrow_mut().push(hole.clone());
        }
        typ
    }

    /// Fills every operator placeholder that is still empty with the default type of its class.
    pub fn default_classes(&self) {
        if !self.session.options.default_classes {
            return;
        }

        for hole in self.session.classes.borrow().iter() {
            let typ = MonoType::Hole(hole.clone());
            if let MonoType::Hole(last) = &*Rc::new(typ).flatten() {
                if let Hole::Empty {
                    class: Some(class), ..
                } = last.get()
                {
                    debug!("defaulting ^{} of class {class}", last.name());
                    last.fill(MonoType::base(class.default_type()));
                }
            }
        }
    }

    pub fn error<T>(&self, msg: impl Into<String>) -> Result<T> {
        Err(Error::new(msg, self.location))
    }

    /// Records what was discovered about a node.
    pub fn annotate(&self, id: NodeId, annotation: Annotation) {
        self.session.annotations.borrow_mut().record(id, annotation);
    }

    /// Takes the annotations recorded so far out of the session.
    pub fn take_annotations(&self) -> Annotations {
        self.session.annotations.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_tree::r#abstract::BaseType;

    #[test]
    fn names_are_fresh_and_readable() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let names = (0..28).map(|_| ctx.new_name()).collect::<Vec<_>>();
        assert_eq!(names[0], "'a");
        assert_eq!(names[25], "'z");
        assert_eq!(names[26], "'aa");
        assert_eq!(names[27], "'ab");
    }

    #[test]
    fn stamps_start_after_the_prelude() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let first = ctx.new_stamp("t");
        let second = ctx.level_up().new_stamp("t");
        assert_eq!(first.stamp, 1);
        assert_eq!(second.stamp, 2);
        assert_ne!(first, second);
    }

    #[test]
    fn sessions_do_not_share_counters() {
        let one = Ctx::new(Env::default(), CheckOptions::default());
        let two = Ctx::new(Env::default(), CheckOptions::default());
        assert_eq!(one.new_stamp("t"), two.new_stamp("t"));
    }

    #[test]
    fn unconstrained_class_holes_are_defaulted() {
        let ctx = Ctx::new(Env::default(), CheckOptions::default());
        let numeric = ctx.new_class_hole(Class::Numeric);
        let textual = ctx.new_class_hole(Class::Textual);
        ctx.default_classes();
        assert_eq!(numeric.to_string(), "int");
        assert_eq!(textual.to_string(), "string");
    }

    #[test]
    fn defaulting_can_be_turned_off() {
        let options = CheckOptions {
            default_classes: false,
            ..Default::default()
        };
        let ctx = Ctx::new(Env::default(), options);
        let numeric = ctx.new_class_hole(Class::Numeric);
        ctx.default_classes();
        assert!(matches!(&*numeric.flatten(), MonoType::Hole(_)));
        assert_ne!(numeric.to_string(), BaseType::Int.to_string());
    }
}

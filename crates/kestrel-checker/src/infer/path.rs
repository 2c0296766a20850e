//! Resolution of qualified names through the structures in scope.

use std::rc::Rc;

use kestrel_tree::r#abstract::Path;

use crate::{
    context::Ctx,
    env::{Env, ValueDecl, ValueKind},
    signature::{Existential, Signature},
    types::TypeFun,
    Result,
};

impl Ctx {
    /// The environment of the structure the qualifier of `path` leads to.
    fn qualifier(&self, path: &Path) -> Result<Env> {
        let mut env = self.env.clone();

        for (i, name) in path.qualifier.iter().enumerate() {
            env = match env.modules.get(name) {
                Some(Signature::Structure(inner)) => inner.clone(),
                Some(Signature::Functor(_)) => {
                    return self.error("expected a structure but got a functor")
                }
                None => {
                    return self.error(format!(
                        "unknown module '{}'",
                        path.qualifier[..=i].join(".")
                    ))
                }
            };
        }

        Ok(env)
    }

    pub fn lookup_value(&self, path: &Path) -> Result<ValueDecl> {
        match self.qualifier(path)?.values.get(&path.name) {
            Some(decl) => Ok(decl.clone()),
            None => self.error(format!("unknown value '{path}'")),
        }
    }

    pub fn lookup_type(&self, path: &Path) -> Result<Rc<TypeFun>> {
        match self.qualifier(path)?.types.get(&path.name) {
            Some(fun) => Ok(fun.clone()),
            None => self.error(format!("unknown type '{path}'")),
        }
    }

    pub fn lookup_module(&self, path: &Path) -> Result<Signature> {
        match self.qualifier(path)?.modules.get(&path.name) {
            Some(sig) => Ok(sig.clone()),
            None => self.error(format!("unknown module '{path}'")),
        }
    }

    pub fn lookup_signature(&self, path: &Path) -> Result<Rc<Existential>> {
        match self.qualifier(path)?.signatures.get(&path.name) {
            Some(sig) => Ok(sig.clone()),
            None => self.error(format!("unknown signature '{path}'")),
        }
    }

    /// Looks up a value that must be a constructor, returning its arity too.
    pub fn lookup_constructor(&self, path: &Path) -> Result<(usize, ValueDecl)> {
        let decl = self.lookup_value(path)?;
        match decl.kind {
            ValueKind::Constructor(arity) => Ok((arity, decl)),
            ValueKind::Variable => self.error(format!("'{path}' is not a constructor")),
        }
    }
}

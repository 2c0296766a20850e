//! Checking of whole programs: imports are resolved through a [Resolve] hook supplied by the host,
//! the declarations are checked under the prelude and the imports, and the operator placeholders
//! left are defaulted once at the end.

use kestrel_error::Error;
use kestrel_location::{ByteRange, NodeId};
use kestrel_tree::r#abstract::Program;
use log::{debug, info};

use crate::{
    annotation::{Annotation, Annotations},
    context::{CheckOptions, Ctx},
    env::{Env, Fragment},
    prelude::prelude,
    signature::Existential,
    types::Type,
    Result,
};

/// Resolution of imports. The host decides what a URL means and may check another program to
/// answer, so implementations are called reentrantly with respect to [check_program].
pub trait Resolve {
    /// The abstract names and the structure environment the unit at `url` exports.
    fn resolve(&mut self, location: ByteRange, url: &str) -> Result<Fragment>;
}

/// The result of checking a program.
#[derive(Debug)]
pub struct Checked {
    pub fragment: Fragment,
    pub annotations: Annotations,
}

impl Checked {
    /// What importers of this program see.
    pub fn export(&self) -> Fragment {
        self.fragment.clone()
    }

    pub fn annotation(&self, id: NodeId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// The type of the pattern or expression with the given id.
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        self.annotation(id).and_then(Annotation::typ).cloned()
    }
}

pub fn check_program(
    program: &Program,
    resolver: &mut dyn Resolve,
    options: CheckOptions,
) -> Result<Checked> {
    let ctx = Ctx::new(prelude(), options).set_position(program.location);
    let mut imports = Fragment::default();

    for import in &program.data.imports {
        let ctx = ctx.set_position(import.location);
        let url = &import.data.url;

        debug!("resolving '{}' as {url}", import.data.name);
        let exported = resolver.resolve(import.location, url).map_err(|err| {
            info!("error encountered while loading {url}");
            Error::loading(url.clone(), err, import.location)
        })?;

        let (bound, sig) = Existential::pack(exported).unpack(&ctx);
        let fragment = Fragment::new(bound, Env::module(import.data.name.clone(), sig));

        imports = imports.extend(fragment).or_else(|clash| {
            ctx.error(format!(
                "{} '{}' shadows previous binding",
                clash.namespace, clash.name
            ))
        })?;
    }

    let decs = ctx.adjoin(&imports.env).check_decs(&program.data.decs)?;
    ctx.default_classes();

    let mut bound = imports.bound;
    bound.extend(decs.bound);
    let fragment = Fragment::new(bound, decs.env);

    ctx.annotate(program.id, Annotation::Program(fragment.clone()));

    Ok(Checked {
        fragment,
        annotations: ctx.take_annotations(),
    })
}

/// A resolver for programs without imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

impl Resolve for NoImports {
    fn resolve(&mut self, location: ByteRange, url: &str) -> Result<Fragment> {
        Err(Error::new(format!("cannot resolve {url}: imports are not available"), location))
    }
}


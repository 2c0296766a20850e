//! This crate checks the static semantics of kestrel programs: Hindley-Milner inference with the
//! value restriction for the core language, and elaboration of the module language into
//! existential signatures with generative abstract types.
//!
//! The entry point is [check_program]. Everything found about the tree is written into an
//! [Annotations] table keyed by node ids.

pub mod annotation;
pub mod context;
pub mod env;
pub mod infer;
pub mod matching;
pub mod prelude;
pub mod program;
pub mod signature;
pub mod types;
pub mod unify;

use kestrel_error::Error;

pub use annotation::{Annotation, Annotations};
pub use context::{CheckOptions, Ctx};
pub use env::{Env, Fragment};
pub use program::{check_program, Checked, NoImports, Resolve};
pub use signature::{Existential, FreshNames, KeepNames, Rename, Signature};

pub type Result<T, U = Error> = std::result::Result<T, U>;

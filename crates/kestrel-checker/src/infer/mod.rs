//! Exposes an interface to infer the type of expressions, patterns, types and the module language.
//! The main construction of this module is the [Infer] trait, the rest are the judgments that do
//! not fit its shape: declaration sequences, recursive groups and specifications.

pub mod dec;
pub mod expr;
pub mod module;
pub mod pat;
pub mod path;
pub mod spec;
pub mod typ;

/// This trait exposes a function called [Infer::infer] that tries to discover what a syntax node
/// means. For an expression the result is a type and a type rule that express this is:
///
/// ```md
///    'a = new_hole     G, x: 'a |- e => b'
/// ----------------------------------------
///         G |- fun x -> e => a' -> b'
/// ```
///
/// Patterns also produce the bindings they introduce and module expressions produce an existential
/// signature. Every implementation records its result in the annotation table.
pub trait Infer {
    type Context<'a>;
    type Return;

    /// Infers the meaning of a node.
    fn infer(self, ctx: Self::Context<'_>) -> Self::Return;
}

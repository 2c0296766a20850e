//! The side table where the checker leaves what it found about each node of the tree.

use std::collections::{hash_map::Entry, HashMap};

use kestrel_location::NodeId;

use crate::{env::Fragment, signature::Existential, types::Type};

#[derive(Debug, Clone)]
pub enum Annotation {
    Pattern(Type),
    Expr(Type),
    Dec(Fragment),
    Spec(Fragment),
    Sig(Existential),
    Module(Existential),
    Program(Fragment),
}

impl Annotation {
    /// The type of a pattern or an expression.
    pub fn typ(&self) -> Option<&Type> {
        match self {
            Self::Pattern(typ) | Self::Expr(typ) => Some(typ),
            _ => None,
        }
    }

    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Dec(fragment) | Self::Spec(fragment) | Self::Program(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn existential(&self) -> Option<&Existential> {
        match self {
            Self::Sig(existential) | Self::Module(existential) => Some(existential),
            _ => None,
        }
    }
}

/// Every node is annotated at most once. Checking a node twice is a bug of the checker, not of the
/// program being checked.
#[derive(Debug, Default)]
pub struct Annotations {
    slots: HashMap<NodeId, Annotation>,
}

impl Annotations {
    pub fn record(&mut self, id: NodeId, annotation: Annotation) {
        match self.slots.entry(id) {
            Entry::Occupied(_) => panic!("ICE: node {id} was annotated twice"),
            Entry::Vacant(slot) => {
                slot.insert(annotation);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Annotation> {
        self.slots.get(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

//! The syntax tree consumed by the checker. It does not depend on anything of the compiler, only
//! on kestrel-location which localizes nodes in the source and gives each of them an identity.
//!
//! The tree is purely syntactic: whatever the checker discovers about a node is stored in a side
//! table keyed by the node's [kestrel_location::NodeId], never in the tree itself.

pub mod r#abstract;

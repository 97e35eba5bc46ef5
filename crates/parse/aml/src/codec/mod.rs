//! AML byte stream codec.
//!
//! - [`parser`]: bytes to tree, driven by an injected [`Grammar`](crate::Grammar).
//! - [`serializer`]: tree to bytes, with package lengths and the table
//!   header recomputed.
//! - [`pkg_length`]: the variable-width PkgLength integer.

pub mod parser;
pub mod pkg_length;
pub mod serializer;

pub use parser::{ParseOptions, Parser, parse_definition_block, parse_term_list};

//! Parser and serializer for the constrained rich-text document grammar.
//!
//! Arbitrary HTML is mapped leniently onto a closed vocabulary of tags and a
//! bounded attribute set; serialization is canonical so a parse/serialize
//! round trip is byte-identical on canonical input.

pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{Attributes, Document, Node, NodeData, NodeId, Tag};
pub use error::{ParseError, ParseResult};
pub use parser::parse;
pub use serializer::{serialize, serialize_node};

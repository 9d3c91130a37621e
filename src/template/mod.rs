//! ERB template parsing
//!
//! Templates are scanned into two flat, document-ordered streams: literal
//! markup tags and embedded Ruby regions. Linters walk those streams
//! rather than a DOM, so malformed markup outside the constructs they
//! care about never blocks a lint run.

mod document;
mod node;
mod parser;

pub use document::Template;
pub use node::{AttrPresence, Attribute, ErbKind, ErbRegion, TagNode};
pub use parser::ParseError;

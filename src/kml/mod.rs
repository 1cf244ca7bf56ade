//! KML boundary document parsing.
//!
//! Extracts polygon rings and placemark attributes from a KML stream
//! without building a document tree.

mod coordinates;
mod parser;

pub use coordinates::parse_coordinate_list;
pub use parser::{
    parse_document, parse_path, ParseProgress, ParserOptions, ZoneStream, DEFAULT_PROGRESS_EVERY,
};

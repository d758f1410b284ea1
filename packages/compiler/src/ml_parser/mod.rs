//! ML Parser Module
//!
//! XML reading and writing for templates, documents and stylesheets, plus the HTML
//! serialization tables.

pub mod ast;
pub mod html_tags;
pub mod serializer;
pub mod tags;
pub mod xml_parser;

pub use ast::{Attribute, Comment, Element, Node, ProcessingInstruction, Text};
pub use serializer::{serialize_element, serialize_nodes};
pub use xml_parser::{parse_document, parse_fragment, ParseTreeResult, XmlParser};

//! XML Parser
//!
//! Reads templates, documents and stylesheets into the crate DOM. Built on quick-xml's pull
//! reader; every node keeps the span it was read from so errors can point into the source.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::parse_util::{ParseError, ParseLocation, ParseSourceFile, ParseSourceSpan};

use super::ast::{Attribute, Comment, Element, Node, ProcessingInstruction, Text};

/// Result of parsing a fragment: the top-level nodes, or the errors that stopped the reader.
#[derive(Debug, Clone)]
pub struct ParseTreeResult {
    pub root_nodes: Vec<Node>,
    pub errors: Vec<ParseError>,
}

/// XML fragment parser
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlParser;

impl XmlParser {
    pub fn new() -> Self {
        XmlParser
    }

    /// Parse a fragment. Multiple top-level nodes are allowed.
    pub fn parse(&self, source: &str, url: &str) -> ParseTreeResult {
        let file = Arc::new(ParseSourceFile::new(source, url));
        match TreeBuilder::new(file).build() {
            Ok(root_nodes) => ParseTreeResult {
                root_nodes,
                errors: Vec::new(),
            },
            Err(error) => ParseTreeResult {
                root_nodes: Vec::new(),
                errors: vec![error],
            },
        }
    }
}

/// Parse a fragment, failing on the first error.
pub fn parse_fragment(source: &str, url: &str) -> Result<Vec<Node>, ParseError> {
    let mut result = XmlParser::new().parse(source, url);
    match result.errors.pop() {
        Some(error) => Err(error),
        None => Ok(result.root_nodes),
    }
}

/// Parse a document and return its root element.
pub fn parse_document(source: &str, url: &str) -> Result<Element, ParseError> {
    let nodes = parse_fragment(source, url)?;
    let file = Arc::new(ParseSourceFile::new(source, url));
    let mut roots = nodes.into_iter().filter_map(|node| match node {
        Node::Element(element) => Some(element),
        _ => None,
    });
    let root = roots
        .next()
        .ok_or_else(|| ParseError::at_offset(&file, 0, "Document has no root element"))?;
    if roots.next().is_some() {
        return Err(ParseError::at_offset(
            &file,
            0,
            "Document has more than one root element",
        ));
    }
    Ok(root)
}

struct TreeBuilder {
    file: Arc<ParseSourceFile>,
    stack: Vec<Element>,
    root_nodes: Vec<Node>,
}

impl TreeBuilder {
    fn new(file: Arc<ParseSourceFile>) -> Self {
        TreeBuilder {
            file,
            stack: Vec::new(),
            root_nodes: Vec::new(),
        }
    }

    fn build(mut self) -> Result<Vec<Node>, ParseError> {
        let file = self.file.clone();
        let mut reader = Reader::from_str(&file.content);
        reader.config_mut().trim_text(false);

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|err| {
                ParseError::at_offset(&file, reader.error_position() as usize, err.to_string())
            })?;
            let end = reader.buffer_position() as usize;
            let span = self.span(start, end);

            match event {
                Event::Start(tag) => {
                    let element = self.element(&tag, span, start)?;
                    self.stack.push(element);
                }
                Event::Empty(tag) => {
                    let element = self.element(&tag, span, start)?;
                    self.append(Node::Element(element));
                }
                Event::End(tag) => {
                    let element = self.stack.pop().ok_or_else(|| {
                        ParseError::at_offset(
                            &file,
                            start,
                            format!(
                                "Unexpected closing tag \"{}\"",
                                String::from_utf8_lossy(tag.name().as_ref())
                            ),
                        )
                    })?;
                    self.append(Node::Element(element));
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|err| ParseError::at_offset(&file, start, err.to_string()))?;
                    self.append_text(&value, span);
                }
                Event::CData(data) => {
                    self.append_text(&String::from_utf8_lossy(&data), span);
                }
                Event::Comment(comment) => {
                    self.append(Node::Comment(Comment {
                        value: String::from_utf8_lossy(&comment).into_owned(),
                        source_span: Some(span),
                    }));
                }
                Event::PI(pi) => {
                    self.append(Node::ProcessingInstruction(ProcessingInstruction {
                        target: String::from_utf8_lossy(pi.target()).into_owned(),
                        content: String::from_utf8_lossy(pi.content()).trim().to_string(),
                        source_span: Some(span),
                    }));
                }
                Event::Eof => break,
                // XML declarations and doctypes carry nothing the compiler uses.
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(ParseError::at_offset(
                &file,
                file.content.len(),
                format!("Unclosed element \"{}\"", open.name),
            ));
        }
        Ok(self.root_nodes)
    }

    fn span(&self, start: usize, end: usize) -> ParseSourceSpan {
        ParseSourceSpan::new(
            ParseLocation::from_offset(self.file.clone(), start),
            ParseLocation::from_offset(self.file.clone(), end),
        )
    }

    fn element(
        &self,
        tag: &BytesStart<'_>,
        span: ParseSourceSpan,
        start: usize,
    ) -> Result<Element, ParseError> {
        let mut element = Element::new(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
        for attr in tag.attributes() {
            let attr = attr.map_err(|err| ParseError::at_offset(&self.file, start, err.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|err| ParseError::at_offset(&self.file, start, err.to_string()))?;
            element.attrs.push(Attribute {
                name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value: value.into_owned(),
                source_span: Some(span.clone()),
            });
        }
        element.source_span = Some(span);
        Ok(element)
    }

    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root_nodes,
        }
    }

    fn append(&mut self, node: Node) {
        self.siblings().push(node);
    }

    /// Adjacent text and CDATA sections form a single text node.
    fn append_text(&mut self, value: &str, span: ParseSourceSpan) {
        let siblings = self.siblings();
        if let Some(Node::Text(previous)) = siblings.last_mut() {
            previous.value.push_str(value);
            if let Some(previous_span) = previous.source_span.as_mut() {
                previous_span.end = span.end;
            }
            return;
        }
        siblings.push(Node::Text(Text {
            value: value.to_string(),
            source_span: Some(span),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_top_level_nodes() {
        let nodes = parse_fragment("<b>x</b> <xsl:apply-templates/>", "t").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes[2].is_xsl("apply-templates"));
    }

    #[test]
    fn decodes_entities_and_cdata() {
        let nodes = parse_fragment("<p a=\"&lt;&amp;\">1 &gt; 0<![CDATA[<x>]]></p>", "t").unwrap();
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.attr("a"), Some("<&"));
        assert_eq!(p.children.len(), 1);
        assert_eq!(p.text_content(), "1 > 0<x>");
    }

    #[test]
    fn reports_unclosed_elements() {
        let error = parse_fragment("<a><b></b>", "t").unwrap_err();
        assert!(error.msg.contains("Unclosed element \"a\""));
    }

    #[test]
    fn records_spans() {
        let nodes = parse_fragment("<a>\n<b/></a>", "t").unwrap();
        let b = nodes[0].as_element().unwrap().child_elements().next().unwrap();
        let span = b.source_span.as_ref().unwrap();
        assert_eq!(span.start.line, 1);
        assert_eq!(span.text(), "<b/>");
    }

    #[test]
    fn documents_need_a_single_root() {
        assert!(parse_document("<r><B>x</B></r>", "doc").is_ok());
        assert!(parse_document("<r/><t/>", "doc").is_err());
        assert!(parse_document("text", "doc").is_err());
    }
}

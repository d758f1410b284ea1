/**
 * XML Parser Tests
 *
 * Reading templates and documents into the DOM, writing them back, and the HTML output
 * tables shared by the renderers.
 */

#[cfg(test)]
mod tests {
    use tagform_compiler::ml_parser::ast::{walk_elements, Element, Node};
    use tagform_compiler::ml_parser::html_tags::{escape_attribute, escape_text, format_attribute};
    use tagform_compiler::ml_parser::{parse_document, parse_fragment, serialize_nodes, XmlParser};

    fn element_names(nodes: &[Node]) -> Vec<String> {
        let mut names = Vec::new();
        walk_elements(nodes, &mut |element: &Element| names.push(element.name.clone()));
        names
    }

    mod fragments {
        use super::*;

        #[test]
        fn should_allow_several_top_level_nodes() {
            let nodes = parse_fragment("a<b/>c<!--d-->", "t.xsl").unwrap();
            assert_eq!(nodes.len(), 4);
            assert!(matches!(&nodes[0], Node::Text(text) if text.value == "a"));
            assert!(matches!(&nodes[3], Node::Comment(comment) if comment.value == "d"));
        }

        #[test]
        fn should_keep_xsl_prefixes_in_names() {
            let nodes = parse_fragment(
                r#"<xsl:if test="@a"><b><xsl:value-of select="@a"/></b></xsl:if>"#,
                "t.xsl",
            )
            .unwrap();
            assert_eq!(element_names(&nodes), vec!["xsl:if", "b", "xsl:value-of"]);
            assert!(nodes[0].is_xsl("if"));
        }

        #[test]
        fn should_keep_whitespace_text() {
            let nodes = parse_fragment("<b> </b>", "t.xsl").unwrap();
            let b = nodes[0].as_element().unwrap();
            assert!(b.children[0].is_blank_text());
        }

        #[test]
        fn should_decode_entities_in_text_and_attributes() {
            let nodes = parse_fragment(r#"<a title="&quot;x&quot; &amp; y">&lt;&gt;</a>"#, "t.xsl")
                .unwrap();
            let a = nodes[0].as_element().unwrap();
            assert_eq!(a.attr("title"), Some("\"x\" & y"));
            assert_eq!(a.text_content(), "<>");
        }

        #[test]
        fn should_read_processing_instructions() {
            let nodes = parse_fragment("<?php echo 1; ?>", "t.xsl").unwrap();
            assert!(matches!(
                &nodes[0],
                Node::ProcessingInstruction(pi) if pi.target == "php" && pi.content == "echo 1;"
            ));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn should_report_unclosed_elements() {
            let error = parse_fragment("<b><i></i>", "t.xsl").unwrap_err();
            assert!(error.msg.contains("Unclosed element \"b\""), "{}", error.msg);
            assert_eq!(error.span.start.offset, 10);
        }

        #[test]
        fn should_report_mismatched_end_tags() {
            assert!(parse_fragment("<b></i>", "t.xsl").is_err());
        }

        #[test]
        fn should_collect_errors_instead_of_nodes() {
            let result = XmlParser::new().parse("<b>", "t.xsl");
            assert!(result.root_nodes.is_empty());
            assert_eq!(result.errors.len(), 1);
        }

        #[test]
        fn should_require_exactly_one_document_root() {
            assert!(parse_document("", "d.xml").is_err());
            assert!(parse_document("<r/><t/>", "d.xml").is_err());
            assert_eq!(parse_document("<r>x</r>", "d.xml").unwrap().name, "r");
        }
    }

    mod serialization {
        use super::*;

        #[test]
        fn should_write_back_what_was_read() {
            let source = r#"<xsl:choose><xsl:when test="@a='x'"><i>x</i></xsl:when><xsl:otherwise><br/></xsl:otherwise></xsl:choose>"#;
            let nodes = parse_fragment(source, "t.xsl").unwrap();
            assert_eq!(serialize_nodes(&nodes), source);
        }

        #[test]
        fn should_escape_html_text_and_attributes() {
            assert_eq!(escape_text("<a href=\"x\">&</a>"), "&lt;a href=\"x\"&gt;&amp;&lt;/a&gt;");
            assert_eq!(escape_attribute("\"<&>'"), "&quot;&lt;&amp;&gt;'");
            assert_eq!(format_attribute("disabled", ""), " disabled");
            assert_eq!(format_attribute("class", "a b"), " class=\"a b\"");
        }
    }
}

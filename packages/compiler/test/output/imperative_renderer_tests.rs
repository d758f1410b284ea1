/**
 * Imperative Renderer Tests
 *
 * The statement renderer over the corpus ruleset: the quick path either declines or agrees
 * with the tree renderer, conditional attributes render as expected and the emitted source
 * shares bodies between tags.
 */

#[path = "../corpus/mod.rs"]
mod corpus;

#[cfg(test)]
mod tests {
    use super::corpus;
    use tagform_compiler::schema::{AttributeDeclaration, AttributeDeclarations};
    use tagform_compiler::{Compiler, CompilerConfig, RenderError, Renderer, TagDefinition};

    fn corpus_renderer() -> Renderer {
        Compiler::from_ruleset(corpus::ruleset())
            .compile()
            .unwrap()
            .renderer
    }

    mod quick_path {
        use super::*;

        #[test]
        fn should_agree_with_the_tree_renderer() {
            let renderer = corpus_renderer();
            let mut quick = 0;
            for xml in corpus::DOCUMENTS {
                let tree = renderer.render_tree(xml).unwrap();
                if let Some(html) = renderer.try_quick(xml) {
                    assert_eq!(html, tree, "quick path disagrees on {}", xml);
                    quick += 1;
                }
                assert_eq!(renderer.render(xml).unwrap(), tree);
            }
            assert!(quick > 0, "no document took the quick path");
        }

        #[test]
        fn should_be_skipped_when_disabled() {
            let renderer = corpus_renderer().with_quick_path(false);
            let xml = corpus::DOCUMENTS[0];
            assert_eq!(
                renderer.render(xml).unwrap(),
                "<b>bold</b> and <b>strong</b>"
            );
        }
    }

    mod rendering {
        use super::*;

        fn title_renderer() -> Renderer {
            let mut attributes = AttributeDeclarations::new();
            attributes.insert("title".to_string(), AttributeDeclaration::new());
            let mut compiler = Compiler::new(CompilerConfig::default());
            compiler.add_tag(
                "A",
                TagDefinition::new(
                    r#"<a><xsl:if test="@title"><xsl:attribute name="title"><xsl:value-of select="@title"/></xsl:attribute></xsl:if><xsl:apply-templates/></a>"#,
                )
                .with_attributes(attributes),
            );
            compiler.compile().unwrap().renderer
        }

        #[test]
        fn should_render_conditional_attributes() {
            let renderer = title_renderer();
            for (xml, expected) in [
                (r#"<r><A title="x">hi</A></r>"#, r#"<a title="x">hi</a>"#),
                ("<r><A>hi</A></r>", "<a>hi</a>"),
            ] {
                assert_eq!(renderer.render(xml).unwrap(), expected);
                assert_eq!(renderer.render_tree(xml).unwrap(), expected);
            }
        }

        #[test]
        fn should_escape_text_and_attributes() {
            let renderer = corpus_renderer();
            assert_eq!(
                renderer
                    .render_tree(r#"<r><URL url="http://x/?a=1&amp;b=2" title="&quot;q&quot;">a &lt; b</URL></r>"#)
                    .unwrap(),
                r#"<a href="http://x/?a=1&amp;b=2" title="&quot;q&quot;">a &lt; b</a>"#
            );
        }

        #[test]
        fn should_drop_void_element_content() {
            let renderer = corpus_renderer();
            assert_eq!(renderer.render_tree("<r><HR>ignored</HR></r>").unwrap(), "<hr>");
        }

        #[test]
        fn should_report_malformed_documents() {
            assert!(matches!(
                corpus_renderer().render("<r><B>x</r>"),
                Err(RenderError::Document(_))
            ));
        }
    }

    mod source {
        use super::*;

        #[test]
        fn should_emit_a_render_function() {
            let source = corpus_renderer().source();
            assert!(source.starts_with("function render(node, raw) {"), "{}", source);
            assert!(source.contains("default:"));
        }

        #[test]
        fn should_share_bodies_between_tags() {
            let source = corpus_renderer().source();
            let lines: Vec<&str> = source.lines().map(str::trim).collect();
            let b = lines
                .iter()
                .position(|line| *line == "case 'B':")
                .unwrap_or_else(|| panic!("no case for B in {}", source));
            assert_eq!(lines[b + 1], "case 'STRONG':");
        }
    }
}

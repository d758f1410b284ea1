/**
 * Optimizer Tests
 *
 * The optimizer moves and deletes close tags; it must never change what a template renders.
 * Every corpus document is rendered through the raw IR, with closes fired implicitly, and
 * through the normalized IR, and the outputs compared. The normalized IR must also render
 * what the stylesheet does.
 */

#[path = "../corpus/mod.rs"]
mod corpus;

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::corpus;
    use tagform_compiler::compiler::CompiledTemplate;
    use tagform_compiler::config::CompilerConfig;
    use tagform_compiler::template::pipeline::ir::{dump_template, walk, Node, Template};
    use tagform_compiler::template::pipeline::src::Interpreter;
    use tagform_compiler::xslt::BUILTIN_TEMPLATES;
    use tagform_compiler::{normalize, parse, AttributeDeclarations, Compiler};

    fn templates(normalized: bool) -> IndexMap<String, Template> {
        corpus::all_templates()
            .into_iter()
            .chain(BUILTIN_TEMPLATES.iter().copied())
            .map(|(name, source)| {
                let mut template = parse(source).unwrap();
                if normalized {
                    normalize(&mut template).unwrap();
                }
                (name.to_string(), template)
            })
            .collect()
    }

    mod output_preservation {
        use super::*;

        #[test]
        fn should_render_the_corpus_like_the_raw_ir() {
            let raw = templates(false);
            let optimized = templates(true);
            let params = corpus::parameters();
            let before = Interpreter::new(&raw, &params).with_implicit_closes(true);
            let after = Interpreter::new(&optimized, &params);
            for xml in corpus::all_documents() {
                assert_eq!(
                    after.render(xml).unwrap(),
                    before.render(xml).unwrap(),
                    "output changed for {}",
                    xml
                );
            }
        }

        #[test]
        fn should_render_the_corpus_like_the_stylesheet() {
            let optimized = templates(true);
            let params = corpus::parameters();
            let interpreter = Interpreter::new(&optimized, &params);
            let bundle = Compiler::from_ruleset(corpus::ruleset()).compile().unwrap();
            for xml in corpus::DOCUMENTS {
                assert_eq!(
                    interpreter.render(xml).unwrap(),
                    bundle.transform(xml).unwrap(),
                    "interpreter and stylesheet differ on {}",
                    xml
                );
            }
        }

        #[test]
        fn should_keep_closes_that_sit_behind_empty_cases() {
            let source = concat!(
                r#"<div><xsl:choose><xsl:when test="@a"><xsl:attribute name="class">a</xsl:attribute></xsl:when>"#,
                r#"<xsl:when test="@b">B</xsl:when></xsl:choose>"#,
                r#"<xsl:if test="@c"><xsl:attribute name="title">c</xsl:attribute></xsl:if>C</div>"#
            );
            let mut raw = IndexMap::new();
            raw.insert("X".to_string(), parse(source).unwrap());
            let mut optimized = raw.clone();
            for template in optimized.values_mut() {
                normalize(template).unwrap();
            }
            let params = corpus::parameters();
            for xml in [
                r#"<r><X a="1" c="1"/></r>"#,
                r#"<r><X b="1"/></r>"#,
                r#"<r><X c="1"/></r>"#,
                "<r><X/></r>",
            ] {
                let expected = Interpreter::new(&raw, &params)
                    .with_implicit_closes(true)
                    .render(xml)
                    .unwrap();
                assert_eq!(
                    Interpreter::new(&optimized, &params).render(xml).unwrap(),
                    expected,
                    "{}",
                    dump_template(&optimized["X"])
                );
            }
        }
    }

    mod conditional_attribute {
        use super::*;

        const SOURCE: &str = r#"<a><xsl:if test="@title"><xsl:attribute name="title"><xsl:value-of select="@title"/></xsl:attribute></xsl:if><xsl:apply-templates/></a>"#;

        fn compiled() -> CompiledTemplate {
            let mut declarations = AttributeDeclarations::new();
            declarations.insert("title".to_string(), Default::default());
            CompiledTemplate::compile(SOURCE, &declarations, &CompilerConfig::default()).unwrap()
        }

        #[test]
        fn should_become_a_single_attribute_copy() {
            let template = compiled().template;
            let mut copies = Vec::new();
            let mut switches = 0;
            walk(&template.nodes, &mut |node| match node {
                Node::CopyAttributes(copy) => copies.push(copy.names.clone()),
                Node::Switch(_) => switches += 1,
                _ => {}
            });
            assert_eq!(copies, vec![Some(vec!["title".to_string()])]);
            assert_eq!(switches, 0, "{}", dump_template(&template));
        }

        #[test]
        fn should_render_with_and_without_the_attribute() {
            let mut templates = IndexMap::new();
            templates.insert("A".to_string(), compiled().template);
            let params = corpus::parameters();
            let interpreter = Interpreter::new(&templates, &params);
            assert_eq!(
                interpreter.render(r#"<r><A title="x">hi</A></r>"#).unwrap(),
                r#"<a title="x">hi</a>"#
            );
            assert_eq!(interpreter.render("<r><A>hi</A></r>").unwrap(), "<a>hi</a>");
        }
    }
}

/**
 * Stylesheet Tests
 *
 * The stylesheet assembled for the corpus ruleset: built-in rules, grouping of identical
 * bodies, parameters, and a processor loaded from its serialized form.
 */

#[path = "../corpus/mod.rs"]
mod corpus;

#[cfg(test)]
mod tests {
    use super::corpus;
    use tagform_compiler::expression_parser::Parameters;
    use tagform_compiler::{Compiler, CompilerConfig, Processor, RendererBundle, TagDefinition};

    fn bundle() -> RendererBundle {
        Compiler::from_ruleset(corpus::ruleset()).compile().unwrap()
    }

    mod assembly {
        use super::*;

        #[test]
        fn should_include_builtin_rules() {
            let bundle = bundle();
            let patterns = bundle.stylesheet.match_patterns();
            for builtin in ["br", "p", "e|i|s"] {
                assert!(patterns.contains(&builtin), "{:?}", patterns);
            }
        }

        #[test]
        fn should_group_identical_bodies() {
            let bundle = bundle();
            let patterns = bundle.stylesheet.match_patterns();
            assert!(patterns.contains(&"B|STRONG"), "{:?}", patterns);
            assert!(!patterns.contains(&"B"));
            let tags: usize = patterns.iter().map(|pattern| pattern.split('|').count()).sum();
            assert_eq!(tags, corpus::TAGS.len() + 5);
        }

        #[test]
        fn should_declare_every_parameter() {
            let xml = bundle().stylesheet.to_xml();
            assert!(xml.contains(r#"<xsl:output method="html" encoding="utf-8" indent="no"/>"#));
            for (name, _) in corpus::PARAMETERS {
                assert!(xml.contains(&format!(r#"<xsl:param name="{}"/>"#, name)), "{}", xml);
            }
        }

        #[test]
        fn should_hold_the_normalized_bodies() {
            let mut compiler = Compiler::new(CompilerConfig::default());
            compiler.add_tag(
                "X",
                TagDefinition::new(r#"<DIV><xsl:text>a</xsl:text><xsl:value-of select="'b'"/></DIV>"#),
            );
            let xml = compiler.compile().unwrap().stylesheet.to_xml();
            assert!(xml.contains(r#"<xsl:template match="X"><div>ab</div></xsl:template>"#), "{}", xml);
        }
    }

    mod processing {
        use super::*;

        #[test]
        fn should_load_the_serialized_stylesheet() {
            let bundle = bundle();
            let processor = Processor::parse(&bundle.stylesheet.to_xml()).unwrap();
            let params = corpus::parameters();
            for xml in corpus::DOCUMENTS {
                assert_eq!(
                    processor.transform(xml, &params).unwrap(),
                    bundle.transform(xml).unwrap(),
                    "{}",
                    xml
                );
            }
        }

        #[test]
        fn should_read_undeclared_parameters_as_empty() {
            let bundle = bundle();
            let processor = Processor::parse(&bundle.stylesheet.to_xml()).unwrap();
            let xml = r#"<r><QUOTE author="Al">x</QUOTE></r>"#;
            let expected = r#"<blockquote><div><cite>Al </cite>x</div></blockquote>"#;
            assert_eq!(processor.transform(xml, &Parameters::new()).unwrap(), expected);
        }
    }
}

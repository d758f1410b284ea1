/**
 * Evaluator Tests
 *
 * The general evaluator against parsed documents: the semantics every renderer falls back
 * to for expressions it does not specialize.
 */

#[cfg(test)]
mod tests {
    use tagform_compiler::expression_parser::evaluator::{evaluate, Value};
    use tagform_compiler::expression_parser::{
        evaluate_boolean, evaluate_string, minify, parse_expression, split_avt, AvtPart, Context,
        ExprShape, Parameters,
    };
    use tagform_compiler::ml_parser::ast::Element;
    use tagform_compiler::ml_parser::parse_document;

    const DOCUMENT: &str = r#"<URL url="http://example.org/?a=1&amp;b=2" size="12" empty=""><s>[url]</s>link<e>[/url]</e></URL>"#;

    fn params() -> Parameters {
        [
            ("L_WROTE".to_string(), "wrote:".to_string()),
            ("SHOW".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn with_context<T>(test: impl FnOnce(&Context<'_>) -> T) -> T {
        let root: Element = parse_document(DOCUMENT, "document.xml").unwrap();
        let params = params();
        let ctx = Context::new(&root, &params);
        test(&ctx)
    }

    fn string(source: &str) -> String {
        with_context(|ctx| evaluate_string(&parse_expression(source).unwrap(), ctx).unwrap())
    }

    fn boolean(source: &str) -> bool {
        with_context(|ctx| evaluate_boolean(&parse_expression(source).unwrap(), ctx).unwrap())
    }

    /// Evaluate an attribute value template the way renderers do
    fn avt(value: &str) -> String {
        split_avt(value)
            .unwrap()
            .into_iter()
            .map(|part| match part {
                AvtPart::Literal(text) => text,
                AvtPart::Expression(source) => string(&source),
            })
            .collect()
    }

    mod attributes_and_parameters {
        use super::*;

        #[test]
        fn should_read_decoded_attribute_values() {
            assert_eq!(string("@url"), "http://example.org/?a=1&b=2");
            assert_eq!(string("@missing"), "");
        }

        #[test]
        fn should_distinguish_empty_from_missing_attributes() {
            assert!(boolean("@empty"));
            assert!(!boolean("@missing"));
            assert!(!boolean("string(@empty)"));
        }

        #[test]
        fn should_treat_parameters_as_strings() {
            assert!(boolean("$SHOW"));
            assert!(!boolean("$UNDECLARED"));
            assert_eq!(string("$L_WROTE"), "wrote:");
            assert!(boolean("$SHOW = 1"));
        }
    }

    mod tests_in_templates {
        use super::*;

        #[test]
        fn should_compare_strings_and_numbers() {
            assert!(boolean("@size = '12'"));
            assert!(boolean("@size = 12.0"));
            assert!(!boolean("@size = '12.0'"));
            assert!(boolean("@size > 9"));
            assert!(!boolean("@missing = ''"));
            assert!(boolean("@missing != 'x' or true()"));
        }

        #[test]
        fn should_chain_equalities_with_or() {
            assert!(boolean("@size='1' or @size='12' or @size='123'"));
            assert!(!boolean("@size='1' or @size='123'"));
        }

        #[test]
        fn should_use_string_functions_on_attributes() {
            assert!(boolean("starts-with(@url, 'http:')"));
            assert!(boolean("contains(@url, '&')"));
            assert_eq!(string("substring-before(@url, '?')"), "http://example.org/");
        }

        #[test]
        fn should_see_children_of_the_tag() {
            assert_eq!(string("count(*)"), "2");
            assert_eq!(string("s"), "[url]");
            assert_eq!(string("."), "[url]link[/url]");
        }

        #[test]
        fn should_union_attribute_node_sets() {
            with_context(|ctx| {
                let expr = parse_expression("@size|@url|@size").unwrap();
                match evaluate(&expr, ctx).unwrap() {
                    Value::NodeSet(nodes) => assert_eq!(nodes.len(), 2),
                    other => panic!("expected a node-set, got {:?}", other),
                }
            });
        }
    }

    mod attribute_value_templates {
        use super::*;

        #[test]
        fn should_interleave_literals_and_expressions() {
            assert_eq!(avt("{@size}px {$L_WROTE}"), "12px wrote:");
            assert_eq!(avt("{{@size}}"), "{@size}");
        }
    }

    mod shapes {
        use super::*;

        fn shape(source: &str) -> ExprShape {
            ExprShape::of(&parse_expression(source).unwrap())
        }

        #[test]
        fn should_classify_fixed_names() {
            assert_eq!(shape("@url"), ExprShape::Attribute("url".to_string()));
            assert_eq!(shape("$L_WROTE"), ExprShape::Parameter("L_WROTE".to_string()));
            assert_eq!(shape("'x'"), ExprShape::Literal("x".to_string()));
            assert_eq!(shape("12"), ExprShape::Literal("12".to_string()));
            assert_eq!(shape("@a='x'"), ExprShape::General);
            assert!(shape("@url").is_fixed_name());
            assert!(!shape("'x'").is_fixed_name());
        }

        #[test]
        fn should_minify_to_a_parseable_form() {
            for source in [" @a = 'x y' ", "not( @a ) and $B", "concat( 'a' , @b )"] {
                let minified = minify(source);
                assert_eq!(minify(&minified), minified);
                assert!(parse_expression(&minified).is_ok());
            }
        }
    }
}

/**
 * Unsafe Checker Tests
 *
 * A battery of templates the verifier must reject, one group per reason, and templates it
 * must accept, the whole verified corpus included.
 */

#[path = "../corpus/mod.rs"]
mod corpus;

#[cfg(test)]
mod tests {
    use super::corpus;
    use tagform_compiler::schema::{AttributeDeclaration, AttributeDeclarations, SinkContext};
    use tagform_compiler::{check_unsafe, CompileError, UnsafeReason, UnsafeTemplateError};

    fn declarations(entries: &[(&str, &[&str])]) -> AttributeDeclarations {
        entries
            .iter()
            .map(|(name, filters)| {
                let declaration = filters
                    .iter()
                    .fold(AttributeDeclaration::new(), |declaration, filter| {
                        declaration.with_filter(*filter)
                    });
                (name.to_string(), declaration)
            })
            .collect()
    }

    fn unsafe_error(template: &str, entries: &[(&str, &[&str])]) -> UnsafeTemplateError {
        match check_unsafe(template, &declarations(entries)) {
            Err(CompileError::Unsafe(error)) => error,
            other => panic!("expected {} to be rejected, got {:?}", template, other),
        }
    }

    fn reason(template: &str, entries: &[(&str, &[&str])]) -> UnsafeReason {
        unsafe_error(template, entries).reason
    }

    fn accepts(template: &str, entries: &[(&str, &[&str])]) {
        if let Err(error) = check_unsafe(template, &declarations(entries)) {
            panic!("expected {} to be accepted: {}", template, error);
        }
    }

    mod rejects {
        use super::*;

        #[test]
        fn should_reject_disabled_escaping() {
            assert_eq!(
                reason(r#"<xsl:value-of select="@x" disable-output-escaping="yes"/>"#, &[("x", &[])]),
                UnsafeReason::DisableOutputEscaping
            );
            assert_eq!(
                reason(r#"<b><xsl:text disable-output-escaping="yes">&lt;</xsl:text></b>"#, &[]),
                UnsafeReason::DisableOutputEscaping
            );
        }

        #[test]
        fn should_reject_copied_subtrees() {
            assert_eq!(reason(r#"<xsl:copy-of select="."/>"#, &[]), UnsafeReason::CopyOfSubtree);
            assert_eq!(reason("<b><xsl:copy/></b>", &[]), UnsafeReason::CopyOfSubtree);
        }

        #[test]
        fn should_reject_processing_instructions() {
            assert_eq!(
                reason("<b><?php echo 1; ?></b>", &[]),
                UnsafeReason::ProcessingInstruction("php".to_string())
            );
            assert_eq!(
                reason(
                    r#"<xsl:processing-instruction name="php">echo 1;</xsl:processing-instruction>"#,
                    &[]
                ),
                UnsafeReason::ProcessingInstruction("php".to_string())
            );
        }

        #[test]
        fn should_reject_dynamic_names() {
            assert_eq!(
                reason(r#"<xsl:element name="{@tag}"><xsl:apply-templates/></xsl:element>"#, &[("tag", &[])]),
                UnsafeReason::DynamicElementName("{@tag}".to_string())
            );
            assert_eq!(
                reason(r#"<b><xsl:attribute name="{@n}">x</xsl:attribute></b>"#, &[("n", &[])]),
                UnsafeReason::DynamicAttributeName("{@n}".to_string())
            );
        }

        #[test]
        fn should_reject_unassessable_expressions() {
            assert_eq!(
                reason(r#"<a href="{$HOME}">x</a>"#, &[]),
                UnsafeReason::UnassessableExpression {
                    expr: "$HOME".to_string(),
                    context: SinkContext::Url,
                }
            );
            assert!(matches!(
                reason("<style><xsl:apply-templates/></style>", &[]),
                UnsafeReason::UnassessableExpression {
                    context: SinkContext::Css,
                    ..
                }
            ));
        }

        #[test]
        fn should_reject_undeclared_attributes_in_sinks() {
            assert_eq!(
                reason(r#"<a href="{@url}"><xsl:apply-templates/></a>"#, &[]),
                UnsafeReason::UnknownAttribute("url".to_string())
            );
            assert_eq!(
                reason(r#"<span><xsl:copy-of select="@style"/></span>"#, &[]),
                UnsafeReason::UnknownAttribute("style".to_string())
            );
        }

        #[test]
        fn should_reject_attributes_without_a_safe_filter() {
            assert_eq!(
                reason(r#"<a href="{@url}">x</a>"#, &[("url", &[])]),
                UnsafeReason::UnsafeInContext {
                    attribute: "url".to_string(),
                    context: SinkContext::Url,
                }
            );
            assert_eq!(
                reason(r#"<span style="color:{@c}">x</span>"#, &[("c", &["#email"])]),
                UnsafeReason::UnsafeInContext {
                    attribute: "c".to_string(),
                    context: SinkContext::Css,
                }
            );
            assert_eq!(
                reason(r#"<b onclick="f({@x})">x</b>"#, &[("x", &["#url"])]),
                UnsafeReason::UnsafeInContext {
                    attribute: "x".to_string(),
                    context: SinkContext::Js,
                }
            );
            assert_eq!(
                reason(
                    r#"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><a xlink:href="{@x}">x</a></svg>"#,
                    &[("x", &[])]
                ),
                UnsafeReason::UnsafeInContext {
                    attribute: "x".to_string(),
                    context: SinkContext::Url,
                }
            );
            assert_eq!(
                reason(
                    r#"<a><xsl:attribute name="xlink:href"><xsl:value-of select="@x"/></xsl:attribute>x</a>"#,
                    &[("x", &[])]
                ),
                UnsafeReason::UnsafeInContext {
                    attribute: "x".to_string(),
                    context: SinkContext::Url,
                }
            );
            assert_eq!(
                reason(r#"<script>var x = <xsl:value-of select="@x"/>;</script>"#, &[("x", &["#color"])]),
                UnsafeReason::UnsafeInContext {
                    attribute: "x".to_string(),
                    context: SinkContext::Js,
                }
            );
        }

        #[test]
        fn should_reject_sinks_inside_loops() {
            assert_eq!(
                reason(
                    r#"<xsl:for-each select="X"><b style="{@c}"/></xsl:for-each>"#,
                    &[("c", &["#color"])]
                ),
                UnsafeReason::InsideLoop {
                    context: SinkContext::Css
                }
            );
            assert_eq!(
                reason(r#"<xsl:for-each select="X"><script>1</script></xsl:for-each>"#, &[]),
                UnsafeReason::InsideLoop {
                    context: SinkContext::Js
                }
            );
        }

        #[test]
        fn should_reject_resource_urls_without_a_fixed_prefix() {
            assert_eq!(
                reason(r#"<script src="{@u}"/>"#, &[("u", &["#url"])]),
                UnsafeReason::UnsafeResourceUrl("script".to_string())
            );
            assert_eq!(
                reason(
                    r#"<iframe><xsl:attribute name="src"><xsl:value-of select="@u"/></xsl:attribute></iframe>"#,
                    &[("u", &["#url"])]
                ),
                UnsafeReason::UnsafeResourceUrl("iframe".to_string())
            );
            assert_eq!(
                reason(r#"<script><xsl:copy-of select="@src"/></script>"#, &[("src", &["#url"])]),
                UnsafeReason::UnsafeResourceUrl("script".to_string())
            );
        }

        #[test]
        fn should_reject_unfiltered_attributes_in_handlers_and_scripts() {
            assert_eq!(
                reason(r#"<div onclick="{@x}">x</div>"#, &[("x", &[])]),
                UnsafeReason::UnsafeInContext {
                    attribute: "x".to_string(),
                    context: SinkContext::Js,
                }
            );
            assert_eq!(
                reason(r#"<script src="{@url}"/>"#, &[("url", &[])]),
                UnsafeReason::UnsafeResourceUrl("script".to_string())
            );
        }
    }

    mod accepts {
        use super::*;

        #[test]
        fn should_accept_the_verified_corpus() {
            for tag in corpus::TAGS {
                if let Err(error) = check_unsafe(tag.template, &corpus::declarations(tag)) {
                    panic!("{} was rejected: {}", tag.name, error);
                }
            }
        }

        #[test]
        fn should_accept_literals_in_sinks() {
            accepts(r#"<a href="{'http://example.org'}">x</a>"#, &[]);
            accepts(r#"<span style="width:{10}px">x</span>"#, &[]);
            accepts("<script>var a = 1;</script>", &[]);
            accepts(r#"<b onclick="f(1)"><xsl:apply-templates/></b>"#, &[]);
        }

        #[test]
        fn should_accept_urls_with_a_fixed_scheme() {
            accepts(r#"<a href="/u/{@id}"><xsl:apply-templates/></a>"#, &[("id", &[])]);
            accepts(
                r#"<iframe src="https://www.youtube.com/embed/{@id}"/>"#,
                &[("id", &[])],
            );
            accepts(
                r#"<a><xsl:attribute name="href">https://x.test/<xsl:value-of select="@p"/></xsl:attribute></a>"#,
                &[("p", &[])],
            );
        }

        #[test]
        fn should_accept_filtered_attributes() {
            accepts(r#"<a href="{@url}"><xsl:apply-templates/></a>"#, &[("url", &["#url"])]);
            accepts(r#"<b onclick="f({@x})">x</b>"#, &[("x", &["#int"])]);
            accepts(r#"<span style="color:{@c}">x</span>"#, &[("c", &["#color"])]);
            accepts(r#"<span><xsl:copy-of select="@*"/></span>"#, &[("title", &[]), ("style", &["#color"])]);
        }

        #[test]
        fn should_ignore_attributes_outside_sinks() {
            accepts(r#"<span title="{@t}"><xsl:value-of select="@t"/></span>"#, &[]);
            accepts(r#"<xsl:if test="$SHOW"><b><xsl:apply-templates/></b></xsl:if>"#, &[]);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn should_name_the_offending_node() {
            let error = unsafe_error(r#"<p><a href="{@url}">x</a></p>"#, &[("url", &[])]);
            assert_eq!(error.node, r#"<a href="{@url}">"#);
        }

        #[test]
        fn should_report_malformed_templates_as_parse_errors() {
            assert!(matches!(
                check_unsafe("<a href=\"x\">", &AttributeDeclarations::new()),
                Err(CompileError::Parse(_))
            ));
        }
    }
}

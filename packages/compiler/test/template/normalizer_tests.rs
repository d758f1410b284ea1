/**
 * Normalizer Tests
 *
 * Properties of the normalized IR over the whole corpus: normalizing is idempotent, every
 * start tag is closed exactly once on every path, and branch tables select the same case as
 * evaluating the tests in order.
 */

#[path = "../corpus/mod.rs"]
mod corpus;

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::corpus;
    use tagform_compiler::expression_parser::{evaluate_boolean, Context, Parameters};
    use tagform_compiler::ml_parser::ast::Element;
    use tagform_compiler::template::pipeline::ir::{
        dump_template, walk, BranchKey, ElementId, Escape, Node, SwitchNode, Template, VoidKind,
    };
    use tagform_compiler::{normalize, parse};

    fn normalized(source: &str) -> Template {
        let mut template = parse(source).unwrap();
        normalize(&mut template).unwrap();
        template
    }

    mod idempotence {
        use super::*;

        #[test]
        fn should_not_change_normalized_templates() {
            for (name, source) in corpus::all_templates() {
                let once = normalized(source);
                let mut twice = once.clone();
                normalize(&mut twice).unwrap();
                assert_eq!(
                    dump_template(&once),
                    dump_template(&twice),
                    "normalizing {} twice changed it",
                    name
                );
                assert_eq!(once, twice);
            }
        }
    }

    /// What a renderer does along one path through a template's switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Open(ElementId),
        Close { id: ElementId, set: bool, check: bool },
        Content,
        /// Guarded attributes are skipped once the start tag was closed
        Attribute { guarded: bool },
        End(ElementId),
    }

    fn paths(nodes: &[Node]) -> Vec<Vec<Event>> {
        let mut result = vec![Vec::new()];
        for node in nodes {
            let continuations = node_paths(node);
            result = result
                .iter()
                .flat_map(|prefix| {
                    continuations.iter().map(move |continuation| {
                        let mut path = prefix.clone();
                        path.extend(continuation.iter().copied());
                        path
                    })
                })
                .collect();
        }
        result
    }

    fn node_paths(node: &Node) -> Vec<Vec<Event>> {
        match node {
            Node::Element(element) => paths(&element.children)
                .into_iter()
                .map(|inner| {
                    let mut path = vec![Event::Open(element.id)];
                    path.extend(inner);
                    path.push(Event::End(element.id));
                    path
                })
                .collect(),
            Node::Switch(switch) => switch
                .cases
                .iter()
                .flat_map(|case| paths(&case.children))
                .collect(),
            Node::CloseTag(close) => vec![vec![Event::Close {
                id: close.id,
                set: close.set,
                check: close.check,
            }]],
            Node::Attribute(attribute) => vec![vec![Event::Attribute {
                guarded: attribute.guarded,
            }]],
            Node::CopyAttributes(copy) => vec![vec![Event::Attribute {
                guarded: copy.guarded,
            }]],
            Node::Output(_) | Node::ApplyChildren | Node::Comment(_) => vec![vec![Event::Content]],
        }
    }

    /// Replay one path with set/check semantics and report the first misplaced event.
    fn replay(path: &[Event]) -> Result<(), String> {
        let mut stack: Vec<(ElementId, bool)> = Vec::new();
        let mut closed: HashSet<ElementId> = HashSet::new();
        for (index, event) in path.iter().enumerate() {
            match *event {
                Event::Open(id) => {
                    if stack.last().is_some_and(|(_, start_open)| *start_open) {
                        return Err(format!("element {:?} opened inside an open start tag at {}", id, index));
                    }
                    stack.push((id, true));
                }
                Event::Close { id, set, check } => {
                    if check && closed.contains(&id) {
                        continue;
                    }
                    let Some(frame) = stack.iter_mut().rev().find(|(frame_id, _)| *frame_id == id) else {
                        return Err(format!("close of {:?} outside the element at {}", id, index));
                    };
                    if !frame.1 {
                        return Err(format!("{:?} closed twice at {}", id, index));
                    }
                    frame.1 = false;
                    if set {
                        closed.insert(id);
                    }
                }
                Event::Content => {
                    if stack.last().is_some_and(|(_, start_open)| *start_open) {
                        return Err(format!("content inside an open start tag at {}", index));
                    }
                }
                Event::Attribute { guarded } => match stack.last() {
                    None => return Err(format!("attribute outside any element at {}", index)),
                    Some((id, false)) if !(guarded && closed.contains(id)) => {
                        return Err(format!("attribute after a closed start tag at {}", index));
                    }
                    _ => {}
                },
                Event::End(id) => match stack.pop() {
                    Some((open_id, false)) if open_id == id => {}
                    other => return Err(format!("end of {:?} with {:?} at {}", id, other, index)),
                },
            }
        }
        Ok(())
    }

    mod closing_completeness {
        use super::*;

        #[test]
        fn should_close_every_start_tag_once_on_every_path() {
            for (name, source) in corpus::all_templates() {
                let template = normalized(source);
                for path in paths(&template.nodes) {
                    if let Err(problem) = replay(&path) {
                        panic!("{}: {}\n{}", name, problem, dump_template(&template));
                    }
                }
            }
        }

        #[test]
        fn should_flag_conditional_closes() {
            let template = normalized(
                concat!(
                    r#"<div><xsl:if test="@a"><xsl:attribute name="class">a</xsl:attribute>A</xsl:if>"#,
                    r#"<xsl:if test="@b"><xsl:attribute name="title">b</xsl:attribute>B</xsl:if>"#,
                    r#"<xsl:apply-templates/></div>"#
                ),
            );
            let mut flags = Vec::new();
            walk(&template.nodes, &mut |node| {
                if let Node::CloseTag(close) = node {
                    flags.push((close.set, close.check));
                }
            });
            assert!(flags.contains(&(true, false)), "{}", dump_template(&template));
            assert!(flags.contains(&(false, true)), "{}", dump_template(&template));
        }

        #[test]
        fn should_detect_a_broken_path() {
            let id = ElementId::new(0);
            let path = [
                Event::Open(id),
                Event::Close { id, set: false, check: false },
                Event::Close { id, set: false, check: false },
                Event::End(id),
            ];
            assert!(replay(&path).is_err());
        }
    }

    mod annotations {
        use super::*;

        #[test]
        fn should_mark_void_elements() {
            let template = normalized(r#"<hr/><xsl:element name="{@n}"/>"#);
            let kinds: Vec<VoidKind> = template.elements.iter().map(|element| element.void).collect();
            assert_eq!(kinds, vec![VoidKind::Yes, VoidKind::Maybe]);
        }

        #[test]
        fn should_resolve_escaping_contexts() {
            let template = normalized(
                r#"<b title="{@t}"><xsl:value-of select="@x"/></b><style><xsl:value-of select="@y"/></style>"#,
            );
            let mut escapes = Vec::new();
            walk(&template.nodes, &mut |node| {
                if let Node::Output(output) = node {
                    if output.value.as_literal().is_none() {
                        escapes.push(output.escape);
                    }
                }
            });
            assert_eq!(escapes, vec![Escape::Attribute, Escape::Text, Escape::Raw]);
        }

        #[test]
        fn should_mark_boolean_attributes() {
            let template =
                normalized(r#"<input><xsl:attribute name="checked">checked</xsl:attribute></input>"#);
            let mut booleans = Vec::new();
            walk(&template.nodes, &mut |node| {
                if let Node::Attribute(attribute) = node {
                    booleans.push(attribute.boolean);
                }
            });
            assert_eq!(booleans, vec![true]);
        }

        #[test]
        fn should_give_every_switch_one_default_case() {
            for (name, source) in corpus::all_templates() {
                let template = normalized(source);
                walk(&template.nodes, &mut |node| {
                    if let Node::Switch(switch) = node {
                        let defaults = switch.cases.iter().filter(|case| case.is_default()).count();
                        assert!(defaults <= 1, "{} has {} default cases", name, defaults);
                        if let Some(position) = switch.cases.iter().position(|case| case.is_default()) {
                            assert_eq!(position, switch.cases.len() - 1, "{}", name);
                        }
                    }
                });
            }
        }
    }

    mod branch_tables {
        use super::*;

        fn first_match(switch: &SwitchNode, ctx: &Context<'_>) -> Option<usize> {
            switch.cases.iter().position(|case| match &case.test {
                Some(test) => evaluate_boolean(&test.ast().unwrap(), ctx).unwrap(),
                None => true,
            })
        }

        fn table_lookup(switch: &SwitchNode, value: Option<&str>) -> Option<usize> {
            let value = value?;
            switch.cases.iter().position(|case| {
                case.values
                    .as_ref()
                    .is_some_and(|values| values.iter().any(|v| v == value))
            })
        }

        fn default_case(switch: &SwitchNode) -> Option<usize> {
            switch.cases.iter().position(|case| case.is_default())
        }

        fn check_switch(switch: &SwitchNode) {
            let Some(key) = &switch.branch_key else {
                return;
            };
            let mut candidates: Vec<Option<String>> = vec![None, Some(String::new()), Some("zz".to_string())];
            for case in &switch.cases {
                for value in case.values.iter().flatten() {
                    candidates.push(Some(value.clone()));
                }
            }
            for candidate in candidates {
                let mut element = Element::new("TAG");
                let mut params = Parameters::new();
                match (key, &candidate) {
                    (BranchKey::Attribute(name), Some(value)) => element.set_attr(name.as_str(), value.as_str()),
                    (BranchKey::Parameter(name), Some(value)) => {
                        params.insert(name.clone(), value.clone());
                    }
                    _ => {}
                }
                let ctx = Context::new(&element, &params);
                let looked_up = table_lookup(switch, candidate.as_deref()).or_else(|| default_case(switch));
                assert_eq!(
                    looked_up,
                    first_match(switch, &ctx),
                    "value {:?} of {:?} selects a different case",
                    candidate,
                    key
                );
            }
        }

        #[test]
        fn should_agree_with_first_match_evaluation() {
            let sources = [
                r#"<xsl:choose><xsl:when test="@k='a' or @k='b'">1</xsl:when><xsl:when test="@k='b' or @k='c'">2</xsl:when><xsl:otherwise>3</xsl:otherwise></xsl:choose>"#,
                r#"<xsl:choose><xsl:when test="$P='x'">1</xsl:when><xsl:when test="'y'=$P">2</xsl:when></xsl:choose>"#,
                r#"<xsl:choose><xsl:when test="@k=''">empty</xsl:when><xsl:when test="@k='a'">a</xsl:when><xsl:otherwise>other</xsl:otherwise></xsl:choose>"#,
            ];
            let corpus_sources: Vec<&str> = corpus::all_templates().into_iter().map(|(_, s)| s).collect();
            let mut tables = 0;
            for source in sources.iter().copied().chain(corpus_sources) {
                let template = normalized(source);
                walk(&template.nodes, &mut |node| {
                    if let Node::Switch(switch) = node {
                        if switch.branch_key.is_some() {
                            tables += 1;
                        }
                        check_switch(switch);
                    }
                });
            }
            assert!(tables >= 4, "only {} branch tables were detected", tables);
        }

        #[test]
        fn should_sort_values_and_drop_claimed_ones() {
            let template = normalized(
                r#"<xsl:choose><xsl:when test="@k='b' or @k='a' or @k='b'">1</xsl:when><xsl:when test="@k='a' or @k='c'">2</xsl:when><xsl:otherwise>3</xsl:otherwise></xsl:choose>"#,
            );
            let Node::Switch(switch) = &template.nodes[0] else {
                panic!("expected a switch:\n{}", dump_template(&template));
            };
            assert_eq!(switch.branch_key, Some(BranchKey::Attribute("k".to_string())));
            assert_eq!(switch.cases[0].values, Some(vec!["a".to_string(), "b".to_string()]));
            assert_eq!(switch.cases[1].values, Some(vec!["c".to_string()]));
        }

        #[test]
        fn should_require_two_cases_on_one_key() {
            for source in [
                r#"<xsl:choose><xsl:when test="@k='a'">1</xsl:when><xsl:otherwise>2</xsl:otherwise></xsl:choose>"#,
                r#"<xsl:choose><xsl:when test="@k='a'">1</xsl:when><xsl:when test="@j='b'">2</xsl:when></xsl:choose>"#,
                r#"<xsl:choose><xsl:when test="@k='a'">1</xsl:when><xsl:when test="@k=@j">2</xsl:when></xsl:choose>"#,
            ] {
                let template = normalized(source);
                walk(&template.nodes, &mut |node| {
                    if let Node::Switch(switch) = node {
                        assert_eq!(switch.branch_key, None, "{}", source);
                    }
                });
            }
        }
    }
}

//! JavaScript and TypeScript dialect
//!
//! Both grammars share the node kinds the model cares about; TypeScript only
//! adds wrapper kinds around parameters and abstract classes.

use tree_sitter::Node;

use super::walker::{
    binding, contains_kind, line, named_children, text, Dialect, NodeKinds, ParameterScan,
};
use super::{Binding, HandlerKind, Import};

static KINDS: NodeKinds = NodeKinds {
    functions: &[
        "function_declaration",
        "function_expression",
        "function",
        "generator_function_declaration",
        "generator_function",
        "arrow_function",
        "method_definition",
    ],
    classes: &["class_declaration", "class", "abstract_class_declaration"],
    branches: &["if_statement", "ternary_expression", "switch_case"],
    loops: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    inline_loops: &[],
    blocks: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "try_statement",
        "switch_statement",
    ],
    handlers: &["catch_clause"],
    tries: &["try_statement"],
    raises: &["throw_statement"],
    comments: &["comment"],
    calls: &["call_expression"],
};

/// Wrappers a declaration may sit in between it and its doc comment
const DECLARATION_WRAPPERS: &[&str] = &[
    "variable_declarator",
    "lexical_declaration",
    "variable_declaration",
    "export_statement",
    "assignment_expression",
    "expression_statement",
    "pair",
    "field_definition",
    "public_field_definition",
];

pub(crate) struct JavaScriptDialect;

impl JavaScriptDialect {
    fn unquote(raw: &str) -> &str {
        raw.trim_matches(|c| c == '"' || c == '\'' || c == '`')
    }

    fn is_plain_string(node: Node<'_>) -> bool {
        match node.kind() {
            "string" => true,
            "template_string" => !contains_kind(node, &["template_substitution"]),
            _ => false,
        }
    }

    /// Last segment of an assignment target (`module.exports.run` -> `run`)
    fn target_name(node: Node<'_>, src: &[u8]) -> Option<String> {
        match node.kind() {
            "identifier" | "property_identifier" | "private_property_identifier" => {
                Some(text(node, src).to_string())
            }
            "member_expression" => node
                .child_by_field_name("property")
                .map(|p| text(p, src).to_string()),
            _ => None,
        }
    }

    /// Identifiers bound by a declarator name (plain or destructured)
    fn pattern_names<'t>(node: Node<'t>, src: &[u8], out: &mut Vec<(String, Node<'t>)>) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                out.push((text(node, src).to_string(), node))
            }
            "object_pattern" | "array_pattern" | "pair_pattern" | "rest_pattern"
            | "assignment_pattern" | "object_assignment_pattern" => {
                let inner = node
                    .child_by_field_name("value")
                    .or_else(|| node.child_by_field_name("left"));
                match inner {
                    Some(inner) => Self::pattern_names(inner, src, out),
                    None => {
                        for child in named_children(node) {
                            Self::pattern_names(child, src, out);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn body_statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        node.child_by_field_name("body")
            .filter(|b| b.kind() == "statement_block")
            .map(|body| {
                named_children(body)
                    .into_iter()
                    .filter(|n| n.kind() != "comment")
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Dialect for JavaScriptDialect {
    fn kinds(&self) -> &'static NodeKinds {
        &KINDS
    }

    fn function_name(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(text(name, src).to_string());
        }
        let parent = node.parent()?;
        match parent.kind() {
            "variable_declarator" => parent
                .child_by_field_name("name")
                .and_then(|n| Self::target_name(n, src)),
            "assignment_expression" => parent
                .child_by_field_name("left")
                .and_then(|n| Self::target_name(n, src)),
            "pair" => parent
                .child_by_field_name("key")
                .map(|k| Self::unquote(text(k, src)).to_string()),
            "field_definition" => parent
                .child_by_field_name("property")
                .map(|p| text(p, src).to_string()),
            "public_field_definition" => parent
                .child_by_field_name("name")
                .map(|p| text(p, src).to_string()),
            _ => None,
        }
    }

    fn class_name(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        self.function_name(node, src)
    }

    fn has_docstring(&self, node: Node<'_>, src: &[u8]) -> bool {
        let mut anchor = node;
        while let Some(parent) = anchor.parent() {
            if DECLARATION_WRAPPERS.contains(&parent.kind()) {
                anchor = parent;
            } else {
                break;
            }
        }

        anchor
            .prev_sibling()
            .filter(|prev| prev.kind() == "comment")
            .map(|comment| {
                text(comment, src).starts_with("/**")
                    && comment.end_position().row + 1 >= anchor.start_position().row
            })
            .unwrap_or(false)
    }

    fn is_boolean_link(&self, node: Node<'_>, src: &[u8]) -> bool {
        node.kind() == "binary_expression"
            && node
                .child_by_field_name("operator")
                .map(|op| matches!(text(op, src), "&&" | "||" | "??"))
                .unwrap_or(false)
    }

    fn continues_branch(&self, node: Node<'_>) -> bool {
        node.kind() == "if_statement"
            && node
                .parent()
                .map(|p| p.kind() == "else_clause")
                .unwrap_or(false)
    }

    fn classify_handler(&self, node: Node<'_>, _src: &[u8]) -> HandlerKind {
        if node.child_by_field_name("parameter").is_none() {
            return HandlerKind::Bare;
        }
        let swallows = node
            .child_by_field_name("body")
            .map(|body| named_children(body).iter().all(|n| n.kind() == "comment"))
            .unwrap_or(true);
        if swallows {
            HandlerKind::Broad
        } else {
            HandlerKind::Specific
        }
    }

    fn collect_imports(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Import>) {
        match node.kind() {
            "import_statement" | "export_statement" => {
                let Some(source) = node.child_by_field_name("source") else {
                    return;
                };
                let wildcard = contains_kind(node, &["namespace_import", "namespace_export"])
                    || super::walker::children(node).iter().any(|c| c.kind() == "*");
                out.push(Import {
                    module: Self::unquote(text(source, src)).to_string(),
                    line: line(node),
                    wildcard,
                });
            }
            "call_expression" => {
                let is_require = node
                    .child_by_field_name("function")
                    .map(|f| text(f, src) == "require")
                    .unwrap_or(false);
                if !is_require {
                    return;
                }
                let module = node
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0))
                    .filter(|arg| arg.kind() == "string");
                if let Some(module) = module {
                    out.push(Import {
                        module: Self::unquote(text(module, src)).to_string(),
                        line: line(node),
                        wildcard: false,
                    });
                }
            }
            _ => {}
        }
    }

    fn collect_bindings(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Binding>) {
        match node.kind() {
            "variable_declarator" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let literal = node
                    .child_by_field_name("value")
                    .map(Self::is_plain_string)
                    .unwrap_or(false);
                let loop_counter = node
                    .parent()
                    .and_then(|decl| decl.parent())
                    .map(|p| matches!(p.kind(), "for_statement" | "for_in_statement"))
                    .unwrap_or(false);

                let mut names = Vec::new();
                Self::pattern_names(name, src, &mut names);
                for (name, at) in names {
                    out.push(binding(at, &name, loop_counter, literal));
                }
            }
            "for_in_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    let mut names = Vec::new();
                    Self::pattern_names(left, src, &mut names);
                    for (name, at) in names {
                        out.push(binding(at, &name, true, false));
                    }
                }
            }
            "assignment_expression" => {
                let Some(left) = node.child_by_field_name("left") else {
                    return;
                };
                if let Some(name) = Self::target_name(left, src) {
                    let literal = node
                        .child_by_field_name("right")
                        .map(Self::is_plain_string)
                        .unwrap_or(false);
                    out.push(binding(left, &name, false, literal));
                }
            }
            "field_definition" | "public_field_definition" => {
                let name = node
                    .child_by_field_name("property")
                    .or_else(|| node.child_by_field_name("name"));
                let Some(name) = name else {
                    return;
                };
                let literal = node
                    .child_by_field_name("value")
                    .map(Self::is_plain_string)
                    .unwrap_or(false);
                out.push(binding(name, text(name, src), false, literal));
            }
            _ => {}
        }
    }

    fn scan_parameters(&self, node: Node<'_>, src: &[u8]) -> ParameterScan {
        let mut scan = ParameterScan::default();

        // `x => x * 2`
        if let Some(single) = node.child_by_field_name("parameter") {
            scan.count = 1;
            scan.bindings
                .push(binding(single, text(single, src), false, false));
            return scan;
        }

        let Some(params) = node.child_by_field_name("parameters") else {
            return scan;
        };
        for param in named_children(params) {
            if param.kind() == "comment" {
                continue;
            }
            scan.count += 1;

            // TypeScript wraps each parameter in required/optional_parameter
            let pattern = match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    param.child_by_field_name("pattern").unwrap_or(param)
                }
                _ => param,
            };
            let mut names = Vec::new();
            Self::pattern_names(pattern, src, &mut names);
            for (name, at) in names {
                scan.bindings.push(binding(at, &name, false, false));
            }
        }
        scan
    }

    fn validates_input(&self, node: Node<'_>, _src: &[u8]) -> bool {
        Self::body_statements(node)
            .into_iter()
            .take(3)
            .any(|statement| {
                statement.kind() == "if_statement"
                    && statement
                        .child_by_field_name("consequence")
                        .map(|c| contains_kind(c, &["throw_statement", "return_statement"]))
                        .unwrap_or(false)
            })
    }
}

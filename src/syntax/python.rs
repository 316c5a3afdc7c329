//! Python dialect (tree-sitter-python)

use tree_sitter::Node;

use super::walker::{
    binding, contains_kind, line, named_children, text, Dialect, NodeKinds, ParameterScan,
};
use super::{Binding, HandlerKind, Import};

static KINDS: NodeKinds = NodeKinds {
    functions: &["function_definition"],
    classes: &["class_definition"],
    branches: &[
        "if_statement",
        "elif_clause",
        "conditional_expression",
        "case_clause",
        "if_clause",
    ],
    loops: &["for_statement", "while_statement"],
    inline_loops: &["for_in_clause"],
    blocks: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "try_statement",
        "with_statement",
        "match_statement",
    ],
    handlers: &["except_clause", "except_group_clause"],
    tries: &["try_statement"],
    raises: &["raise_statement"],
    comments: &["comment"],
    calls: &["call"],
};

const BROAD_EXCEPTIONS: &[&str] = &["Exception", "BaseException"];

pub(crate) struct PythonDialect;

impl PythonDialect {
    /// Statements of a function or class body, comments skipped
    fn body_statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        node.child_by_field_name("body")
            .map(|body| {
                named_children(body)
                    .into_iter()
                    .filter(|n| n.kind() != "comment")
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_docstring(statement: Node<'_>) -> bool {
        statement.kind() == "expression_statement"
            && statement
                .named_child(0)
                .map(|n| matches!(n.kind(), "string" | "concatenated_string"))
                .unwrap_or(false)
    }

    /// Names bound by an assignment or loop target
    fn target_names<'t>(node: Node<'t>, src: &[u8], out: &mut Vec<(String, Node<'t>)>) {
        match node.kind() {
            "identifier" => out.push((text(node, src).to_string(), node)),
            "attribute" => {
                if let Some(attr) = node.child_by_field_name("attribute") {
                    out.push((text(attr, src).to_string(), attr));
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" | "parenthesized_expression"
            | "tuple" | "list" | "list_splat_pattern" => {
                for child in named_children(node) {
                    Self::target_names(child, src, out);
                }
            }
            _ => {}
        }
    }

    fn is_plain_string(node: Node<'_>) -> bool {
        node.kind() == "string"
            && !named_children(node)
                .iter()
                .any(|c| c.kind() == "interpolation")
    }

    fn parameter_name<'t>(param: Node<'t>, src: &[u8]) -> Option<(String, Node<'t>)> {
        match param.kind() {
            "identifier" => Some((text(param, src).to_string(), param)),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .map(|n| (text(n, src).to_string(), n)),
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                named_children(param)
                    .into_iter()
                    .find(|n| n.kind() == "identifier")
                    .map(|n| (text(n, src).to_string(), n))
            }
            _ => None,
        }
    }
}

impl Dialect for PythonDialect {
    fn kinds(&self) -> &'static NodeKinds {
        &KINDS
    }

    fn function_name(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| text(n, src).to_string())
    }

    fn class_name(&self, node: Node<'_>, src: &[u8]) -> Option<String> {
        self.function_name(node, src)
    }

    fn has_docstring(&self, node: Node<'_>, _src: &[u8]) -> bool {
        Self::body_statements(node)
            .first()
            .map(|first| Self::is_docstring(*first))
            .unwrap_or(false)
    }

    fn is_boolean_link(&self, node: Node<'_>, _src: &[u8]) -> bool {
        node.kind() == "boolean_operator"
    }

    fn classify_handler(&self, node: Node<'_>, src: &[u8]) -> HandlerKind {
        let caught = named_children(node)
            .into_iter()
            .find(|n| !matches!(n.kind(), "block" | "comment"));

        let Some(caught) = caught else {
            return HandlerKind::Bare;
        };
        let caught = if caught.kind() == "as_pattern" {
            caught.named_child(0).unwrap_or(caught)
        } else {
            caught
        };

        let names = text(caught, src).trim_matches(|c| c == '(' || c == ')');
        let broad = names
            .split(',')
            .map(str::trim)
            .any(|name| BROAD_EXCEPTIONS.contains(&name));
        if broad {
            HandlerKind::Broad
        } else {
            HandlerKind::Specific
        }
    }

    fn collect_imports(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Import>) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let module = if name.kind() == "aliased_import" {
                        name.child_by_field_name("name").unwrap_or(name)
                    } else {
                        name
                    };
                    out.push(Import {
                        module: text(module, src).to_string(),
                        line: line(node),
                        wildcard: false,
                    });
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    let wildcard = named_children(node)
                        .iter()
                        .any(|c| c.kind() == "wildcard_import");
                    out.push(Import {
                        module: text(module, src).to_string(),
                        line: line(node),
                        wildcard,
                    });
                }
            }
            _ => {}
        }
    }

    fn collect_bindings(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Binding>) {
        let (target, loop_counter, string_literal) = match node.kind() {
            "assignment" => {
                let literal = node
                    .child_by_field_name("right")
                    .map(Self::is_plain_string)
                    .unwrap_or(false);
                (node.child_by_field_name("left"), false, literal)
            }
            "for_statement" | "for_in_clause" => (node.child_by_field_name("left"), true, false),
            _ => return,
        };

        let Some(target) = target else {
            return;
        };
        let mut names = Vec::new();
        Self::target_names(target, src, &mut names);
        for (name, at) in names {
            out.push(binding(at, &name, loop_counter, string_literal));
        }
    }

    fn scan_parameters(&self, node: Node<'_>, src: &[u8]) -> ParameterScan {
        let mut scan = ParameterScan::default();
        let Some(params) = node.child_by_field_name("parameters") else {
            return scan;
        };

        for param in named_children(params) {
            let Some((name, at)) = Self::parameter_name(param, src) else {
                continue;
            };
            scan.count += 1;

            let mutable = param
                .child_by_field_name("value")
                .map(|v| matches!(v.kind(), "list" | "dictionary" | "set"))
                .unwrap_or(false);
            if mutable {
                scan.mutable_defaults.push(name.clone());
            }
            scan.bindings.push(binding(at, &name, false, false));
        }
        scan
    }

    fn validates_input(&self, node: Node<'_>, _src: &[u8]) -> bool {
        Self::body_statements(node)
            .into_iter()
            .filter(|s| !Self::is_docstring(*s))
            .take(3)
            .any(|statement| match statement.kind() {
                "assert_statement" => true,
                "if_statement" => statement
                    .child_by_field_name("consequence")
                    .map(|c| contains_kind(c, &["raise_statement", "return_statement"]))
                    .unwrap_or(false),
                _ => false,
            })
    }
}

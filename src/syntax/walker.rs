//! Single-pass tree walk shared by every language dialect

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::{Binding, ClassUnit, FunctionUnit, HandlerKind, Import, SyntaxModel};

/// Node kinds a dialect maps onto model concepts
pub(crate) struct NodeKinds {
    pub functions: &'static [&'static str],
    pub classes: &'static [&'static str],
    /// Each occurrence is one decision point
    pub branches: &'static [&'static str],
    /// Decision point that also deepens loop nesting
    pub loops: &'static [&'static str],
    /// Decision point without a body of its own (comprehension `for`)
    pub inline_loops: &'static [&'static str],
    /// Control constructs that open a nested block
    pub blocks: &'static [&'static str],
    pub handlers: &'static [&'static str],
    pub tries: &'static [&'static str],
    pub raises: &'static [&'static str],
    pub comments: &'static [&'static str],
    pub calls: &'static [&'static str],
}

/// Parameters of one function as seen by a dialect
#[derive(Debug, Default)]
pub(crate) struct ParameterScan {
    pub count: usize,
    pub mutable_defaults: Vec<String>,
    pub bindings: Vec<Binding>,
}

/// Language-specific knowledge the walker defers to
pub(crate) trait Dialect: Sync {
    fn kinds(&self) -> &'static NodeKinds;

    /// `None` for anonymous functions, which fold into their enclosing unit
    fn function_name(&self, node: Node<'_>, src: &[u8]) -> Option<String>;

    fn class_name(&self, node: Node<'_>, src: &[u8]) -> Option<String>;

    fn has_docstring(&self, node: Node<'_>, src: &[u8]) -> bool;

    fn is_boolean_link(&self, node: Node<'_>, src: &[u8]) -> bool;

    /// `else if` chains stay at the depth of the first `if`
    fn continues_branch(&self, _node: Node<'_>) -> bool {
        false
    }

    fn classify_handler(&self, node: Node<'_>, src: &[u8]) -> HandlerKind;

    fn collect_imports(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Import>);

    fn collect_bindings(&self, node: Node<'_>, src: &[u8], out: &mut Vec<Binding>);

    fn scan_parameters(&self, node: Node<'_>, src: &[u8]) -> ParameterScan;

    fn validates_input(&self, node: Node<'_>, src: &[u8]) -> bool;
}

pub(crate) fn text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

pub(crate) fn line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// True if `node` or any descendant has one of `kinds`
pub(crate) fn contains_kind(node: Node<'_>, kinds: &[&str]) -> bool {
    if kinds.contains(&node.kind()) {
        return true;
    }
    children(node).into_iter().any(|child| contains_kind(child, kinds))
}

pub(crate) fn binding(node: Node<'_>, name: &str, loop_counter: bool, string_literal: bool) -> Binding {
    Binding {
        name: name.to_string(),
        line: line(node),
        loop_counter,
        string_literal,
    }
}

/// First ERROR or MISSING node in document order
pub(crate) fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    for child in children(node) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    Some(node)
}

struct FunctionFrame {
    index: usize,
    depth: u32,
    loop_depth: u32,
}

struct ClassFrame {
    index: usize,
    /// Function frames open when the class was entered
    enclosing_functions: usize,
}

pub(crate) struct ModelWalker<'a> {
    source: &'a [u8],
    dialect: &'a dyn Dialect,
    model: SyntaxModel,
    functions: Vec<FunctionFrame>,
    classes: Vec<ClassFrame>,
    code_rows: BTreeSet<usize>,
    comment_rows: BTreeSet<usize>,
}

impl<'a> ModelWalker<'a> {
    pub(crate) fn new(source: &'a [u8], dialect: &'a dyn Dialect, model: SyntaxModel) -> Self {
        Self {
            source,
            dialect,
            model,
            functions: Vec::new(),
            classes: Vec::new(),
            code_rows: BTreeSet::new(),
            comment_rows: BTreeSet::new(),
        }
    }

    pub(crate) fn run(mut self, root: Node<'_>) -> SyntaxModel {
        self.visit(root);
        self.model.code_line_count = self.code_rows.len();
        self.model.comment_line_count = self.comment_rows.len();
        self.model
    }

    fn visit(&mut self, node: Node<'_>) {
        let kinds = self.dialect.kinds();
        let kind = node.kind();

        if kinds.comments.contains(&kind) {
            self.comment_rows.insert(node.start_position().row);
            return;
        }
        if node.child_count() == 0 {
            if node.end_byte() > node.start_byte() {
                self.code_rows.insert(node.start_position().row);
            }
            return;
        }

        if kinds.functions.contains(&kind) {
            if let Some(name) = self.dialect.function_name(node, self.source) {
                self.enter_function(node, name);
                return;
            }
        }
        if kinds.classes.contains(&kind) {
            if let Some(name) = self.dialect.class_name(node, self.source) {
                self.enter_class(node, name);
                return;
            }
        }

        self.record(node, kind);

        let opens_block = kinds.blocks.contains(&kind) && !self.dialect.continues_branch(node);
        let is_loop = kinds.loops.contains(&kind);
        if let Some(frame) = self.functions.last_mut() {
            let unit = &mut self.model.functions[frame.index];
            if opens_block {
                frame.depth += 1;
                unit.nesting_depth = unit.nesting_depth.max(frame.depth);
            }
            if is_loop {
                frame.loop_depth += 1;
                unit.loop_depth = unit.loop_depth.max(frame.loop_depth);
            }
        }

        self.visit_children(node);

        if let Some(frame) = self.functions.last_mut() {
            if opens_block {
                frame.depth -= 1;
            }
            if is_loop {
                frame.loop_depth -= 1;
            }
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in children(node) {
            self.visit(child);
        }
    }

    /// Per-node facts: decision points, handlers, imports, bindings, calls
    fn record(&mut self, node: Node<'_>, kind: &str) {
        let kinds = self.dialect.kinds();
        let src = self.source;

        let decision = kinds.branches.contains(&kind)
            || kinds.loops.contains(&kind)
            || kinds.inline_loops.contains(&kind)
            || kinds.handlers.contains(&kind)
            || self.dialect.is_boolean_link(node, src);

        if let Some(frame) = self.functions.last() {
            let unit = &mut self.model.functions[frame.index];
            if decision {
                unit.decision_points += 1;
            }
            if kinds.tries.contains(&kind) {
                unit.handles_errors = true;
            }
            if kinds.raises.contains(&kind) {
                unit.raise_count += 1;
            }
        }

        if kinds.handlers.contains(&kind) {
            let handler = super::ExceptionHandler {
                line: line(node),
                kind: self.dialect.classify_handler(node, src),
            };
            self.model.handlers.push(handler);
        }

        if kinds.calls.contains(&kind) {
            if let Some(callee) = node.child_by_field_name("function") {
                let arguments = node
                    .child_by_field_name("arguments")
                    .map(|args| text(args, src).split_whitespace().collect::<String>())
                    .unwrap_or_default();
                self.model.calls.push(super::CallSite {
                    callee: text(callee, src).split_whitespace().collect(),
                    arguments,
                    line: line(node),
                });
            }
        }

        self.dialect.collect_imports(node, src, &mut self.model.imports);
        self.dialect.collect_bindings(node, src, &mut self.model.bindings);
    }

    fn enter_function(&mut self, node: Node<'_>, name: String) {
        let src = self.source;
        let scan = self.dialect.scan_parameters(node, src);

        let class_index = self
            .classes
            .last()
            .filter(|class| class.enclosing_functions == self.functions.len())
            .map(|class| class.index);

        let unit = FunctionUnit {
            name,
            start_line: line(node),
            end_line: node.end_position().row + 1,
            parameter_count: scan.count,
            has_docstring: self.dialect.has_docstring(node, src),
            decision_points: 0,
            nesting_depth: 0,
            loop_depth: 0,
            handles_errors: false,
            raise_count: 0,
            validates_input: self.dialect.validates_input(node, src),
            mutable_defaults: scan.mutable_defaults,
            class_index,
        };
        self.model.bindings.extend(scan.bindings);

        if let Some(index) = class_index {
            self.model.classes[index].methods.push(unit.name.clone());
        }

        let index = self.model.functions.len();
        self.model.functions.push(unit);
        self.functions.push(FunctionFrame {
            index,
            depth: 0,
            loop_depth: 0,
        });
        self.visit_children(node);
        self.functions.pop();
    }

    fn enter_class(&mut self, node: Node<'_>, name: String) {
        let unit = ClassUnit {
            name,
            start_line: line(node),
            end_line: node.end_position().row + 1,
            has_docstring: self.dialect.has_docstring(node, self.source),
            methods: Vec::new(),
        };

        let index = self.model.classes.len();
        self.model.classes.push(unit);
        self.classes.push(ClassFrame {
            index,
            enclosing_functions: self.functions.len(),
        });
        self.visit_children(node);
        self.classes.pop();
    }
}

//! Shared helpers for inspecting Ruby syntax trees.

use std::collections::HashSet;
use tree_sitter::Node;

pub fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// Direct statements of a class or module body. An empty body has no
/// `body_statement` child and yields an empty list.
pub fn body_statements(class_node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = class_node.walk();
    let body = class_node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "body_statement");

    match body {
        Some(body) => {
            let mut cursor = body.walk();
            body.named_children(&mut cursor).collect()
        }
        None => Vec::new(),
    }
}

/// Text of a definition's `name` field.
pub fn method_name<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    let name = node.child_by_field_name("name")?;
    Some(node_text(name, source))
}

/// Callee name of a bare, receiver-less statement. Covers both a lone
/// identifier (`private`) and a parenless or parenthesized call
/// (`before_save :foo`).
pub fn bare_call_name<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "call" => {
            if node.child_by_field_name("receiver").is_some() {
                return None;
            }
            let method = node.child_by_field_name("method")?;
            (method.kind() == "identifier").then(|| node_text(method, source))
        }
        _ => None,
    }
}

/// First positional symbol argument of a call, without the leading colon.
pub fn first_symbol_arg<'s>(call: Node, source: &'s str) -> Option<&'s str> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args.named_children(&mut cursor).next()?;
    (first.kind() == "simple_symbol").then(|| node_text(first, source).trim_start_matches(':'))
}

/// Names invoked as bare, receiver-less calls anywhere inside a method body,
/// in first-occurrence order, deduplicated.
///
/// The grammar cannot distinguish a parenless zero-argument call from a local
/// variable read, so bare identifiers count as call candidates unless the
/// name is bound locally (parameter, block parameter, assignment target)
/// somewhere in the body. Callers additionally filter against the class's
/// method map.
pub fn called_method_names<'s>(method_node: Node, source: &'s str) -> Vec<&'s str> {
    let mut collector = CallCollector {
        source,
        calls: Vec::new(),
        locals: HashSet::new(),
    };
    collector.visit_definition(method_node);

    let locals = collector.locals;
    let mut names = collector.calls;
    let mut seen = HashSet::new();
    names.retain(|n| !locals.contains(n) && seen.insert(*n));
    names
}

struct CallCollector<'s> {
    source: &'s str,
    calls: Vec<&'s str>,
    locals: HashSet<&'s str>,
}

impl<'s> CallCollector<'s> {
    /// Recurse into a definition's children, recording its parameters as
    /// locals and skipping its name so neither is mistaken for a call.
    fn visit_definition(&mut self, def: Node) {
        let name = def.child_by_field_name("name");
        let params = def.child_by_field_name("parameters");

        if let Some(params) = params {
            self.bind_identifiers(params);
        }

        let mut cursor = def.walk();
        for child in def.named_children(&mut cursor) {
            if Some(child) == name || Some(child) == params {
                continue;
            }
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "identifier" => self.calls.push(node_text(node, self.source)),
            "call" => {
                let method = node.child_by_field_name("method");

                if node.child_by_field_name("receiver").is_none()
                    && let Some(m) = method
                    && m.kind() == "identifier"
                {
                    self.calls.push(node_text(m, self.source));
                }

                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child) == method {
                        continue;
                    }
                    self.visit(child);
                }
            }
            // The left-hand side of an assignment is a write, not a call.
            "assignment" | "operator_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    match left.kind() {
                        "identifier" | "left_assignment_list" => self.bind_identifiers(left),
                        _ => self.visit(left),
                    }
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
            }
            "method" | "singleton_method" => self.visit_definition(node),
            "method_parameters" | "block_parameters" | "lambda_parameters"
            | "exception_variable" => self.bind_identifiers(node),
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child);
                }
            }
        }
    }

    fn bind_identifiers(&mut self, node: Node) {
        match node.kind() {
            "identifier" => {
                self.locals.insert(node_text(node, self.source));
            }
            // A default value expression may itself contain calls.
            "optional_parameter" | "keyword_parameter" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind_identifiers(name);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.bind_identifiers(child);
                }
            }
        }
    }
}

/// Byte offset of the first character of the line containing `byte`.
pub fn line_start(source: &str, byte: usize) -> usize {
    source[..byte].rfind('\n').map_or(0, |i| i + 1)
}

/// Byte offset of the newline terminating the line containing `byte`, or the
/// end of the source when the last line is unterminated.
pub fn line_end(source: &str, byte: usize) -> usize {
    source[byte.min(source.len())..]
        .find('\n')
        .map_or(source.len(), |i| byte + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use tree_sitter::Tree;

    fn find_node<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find_node(child, kind) {
                return Some(found);
            }
        }
        None
    }

    fn parse(src: &str) -> Tree {
        parse_source(src).expect("parse should succeed")
    }

    #[test]
    fn body_statements_lists_direct_children() {
        let src = "class Foo\n  def a; end\n\n  private\n\n  def b; end\nend\n";
        let tree = parse(src);
        let class = find_node(tree.root_node(), "class").unwrap();

        let stmts = body_statements(class);
        let kinds: Vec<&str> = stmts.iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["method", "identifier", "method"]);
    }

    #[test]
    fn body_statements_empty_class() {
        let tree = parse("class Foo\nend\n");
        let class = find_node(tree.root_node(), "class").unwrap();
        assert!(body_statements(class).is_empty());
    }

    #[test]
    fn bare_call_name_recognizes_markers_and_callbacks() {
        let src = "class Foo\n  private\n  before_save :normalize, if: :dirty?\nend\n";
        let tree = parse(src);
        let class = find_node(tree.root_node(), "class").unwrap();
        let stmts = body_statements(class);

        assert_eq!(bare_call_name(stmts[0], src), Some("private"));
        assert_eq!(bare_call_name(stmts[1], src), Some("before_save"));
        assert_eq!(first_symbol_arg(stmts[1], src), Some("normalize"));
    }

    #[test]
    fn bare_call_name_rejects_receiver_calls() {
        let src = "class Foo\n  self.before_save :x\nend\n";
        let tree = parse(src);
        let class = find_node(tree.root_node(), "class").unwrap();
        let stmts = body_statements(class);

        assert_eq!(bare_call_name(stmts[0], src), None);
    }

    #[test]
    fn first_symbol_arg_requires_leading_symbol() {
        let src = "class Foo\n  before_save method_ref\nend\n";
        let tree = parse(src);
        let class = find_node(tree.root_node(), "class").unwrap();
        let stmts = body_statements(class);

        assert_eq!(first_symbol_arg(stmts[0], src), None);
    }

    #[test]
    fn called_method_names_collects_in_order_without_duplicates() {
        let src = "def perform\n  method_a\n  method_b(1)\n  method_a\nend\n";
        let tree = parse(src);
        let def = find_node(tree.root_node(), "method").unwrap();

        assert_eq!(called_method_names(def, src), vec!["method_a", "method_b"]);
    }

    #[test]
    fn called_method_names_skips_assignment_targets_and_receivers() {
        let src = "def perform\n  result = compute\n  result.save\nend\n";
        let tree = parse(src);
        let def = find_node(tree.root_node(), "method").unwrap();

        let names = called_method_names(def, src);
        assert!(names.contains(&"compute"));
        assert!(!names.contains(&"save"));
    }

    #[test]
    fn called_method_names_descends_into_blocks() {
        let src = "def perform\n  items.each do |item|\n    handle(item)\n  end\nend\n";
        let tree = parse(src);
        let def = find_node(tree.root_node(), "method").unwrap();

        let names = called_method_names(def, src);
        assert!(names.contains(&"handle"));
        assert!(!names.contains(&"item"), "block parameters are not calls");
    }

    #[test]
    fn called_method_names_ignores_own_name() {
        let src = "def lonely\nend\n";
        let tree = parse(src);
        let def = find_node(tree.root_node(), "method").unwrap();

        assert!(called_method_names(def, src).is_empty());
    }

    #[test]
    fn line_boundaries() {
        let src = "one\ntwo\nthree";
        assert_eq!(line_start(src, 0), 0);
        assert_eq!(line_start(src, 5), 4);
        assert_eq!(line_end(src, 0), 3);
        assert_eq!(line_end(src, 5), 7);
        assert_eq!(line_end(src, 9), src.len());
    }
}

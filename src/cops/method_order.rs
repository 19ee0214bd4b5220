//! Checks that private and protected methods are defined in the order they
//! are first called.
//!
//! Code should read from top to bottom: a called method should be defined
//! below its caller. Public methods are exempt since they are usually called
//! from outside the class. Protected methods are also exempt when the class
//! has both a protected and a private section.
//!
//! Method order cannot be computed for methods called via `send`,
//! metaprogramming, or from superclasses and modules, so suggestions may be
//! slightly off in those cases.

use crate::cop::{Cop, CopCategory, CopContext, CopDescriptor, FixDescriptor};
use crate::cops::util::{
    bare_call_name, body_statements, called_method_names, first_symbol_arg, line_end, line_start,
    method_name, node_text,
};
use crate::diagnostics::{Applicability, Diagnostic, Span, Suggestion};
use crate::fix::TextEdit;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// How the expected method order is derived from the call graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStyle {
    /// Follow each call chain to the bottom before moving on, so a called
    /// method sits as close below its first caller as possible.
    #[default]
    DepthFirst,
    /// Descend one level of abstraction at a time; methods called from more
    /// than one place are deferred below the whole group of callers.
    StepDown,
    /// Alias ordering for step-down, kept as a separate configuration name.
    CommonMethodsBelow,
    /// Ignore the call graph and order methods by name.
    Alphabetical,
}

impl OrderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStyle::DepthFirst => "depth_first",
            OrderStyle::StepDown => "step_down",
            OrderStyle::CommonMethodsBelow => "common_methods_below",
            OrderStyle::Alphabetical => "alphabetical",
        }
    }

    fn defers_common_callees(self) -> bool {
        matches!(self, OrderStyle::StepDown | OrderStyle::CommonMethodsBelow)
    }
}

static METHOD_ORDER: CopDescriptor = CopDescriptor {
    name: "method_order",
    category: CopCategory::Style,
    description: "private/protected methods should be defined in the order they are first called",
    fix: FixDescriptor::safe("moves the method below the method it should follow"),
};

pub struct MethodOrder {
    style: OrderStyle,
}

impl MethodOrder {
    pub fn new(style: OrderStyle) -> Self {
        Self { style }
    }

    fn walk(&self, node: Node, source: &str, ctx: &mut CopContext<'_>) {
        if matches!(node.kind(), "class" | "module") {
            self.check_class(node, source, ctx);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, ctx);
        }
    }

    fn check_class(&self, class_node: Node, source: &str, ctx: &mut CopContext<'_>) {
        let stmts = body_statements(class_node);
        let Some(analysis) = ClassAnalysis::build(self.style, &stmts, source) else {
            return;
        };
        let Some(mismatch) = analysis.first_mismatch() else {
            return;
        };

        let message = format!(
            "Method `{}` should appear below `{}`.",
            mismatch.name, mismatch.previous_name
        );

        ctx.report_diagnostic(Diagnostic {
            cop: &METHOD_ORDER,
            level: ctx.settings().level_for(METHOD_ORDER.name),
            file: None,
            span: Span::from_range(mismatch.method.range()),
            message,
            help: Some(format!(
                "methods should be defined in {} order",
                self.style.as_str()
            )),
            suggestion: Some(plan_move(source, &mismatch)),
        });
    }
}

impl Cop for MethodOrder {
    fn descriptor(&self) -> &'static CopDescriptor {
        &METHOD_ORDER
    }

    fn check(&self, root: Node, ctx: &mut CopContext<'_>) {
        self.walk(root, ctx.source(), ctx);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Public,
    Protected,
    Private,
}

/// One out-of-order method and the node it should be moved below.
struct OrderMismatch<'t, 's> {
    name: &'s str,
    method: Node<'t>,
    previous_name: &'s str,
    previous: Node<'t>,
}

/// Recursive call-graph node. The same method may appear under several
/// callers; only the active root-to-node path is guarded against cycles.
struct CallNode<'s> {
    name: Option<&'s str>,
    children: Vec<CallNode<'s>>,
}

/// Per-class state: one instance per class body, discarded after the check.
struct ClassAnalysis<'t, 's> {
    style: OrderStyle,
    source: &'s str,
    decl_order: Vec<&'s str>,
    defs: HashMap<&'s str, Node<'t>>,
    visibility: HashMap<&'s str, Visibility>,
    ignore_protected: bool,
    marker: Node<'t>,
    reachable: HashSet<&'s str>,
    canonical: Vec<&'s str>,
}

impl<'t, 's> ClassAnalysis<'t, 's> {
    /// Returns `None` when the class has nothing to analyze: no method
    /// definitions, or no applicable visibility marker.
    fn build(style: OrderStyle, stmts: &[Node<'t>], source: &'s str) -> Option<Self> {
        let mut decl_order: Vec<&'s str> = Vec::new();
        let mut defs: HashMap<&'s str, Node<'t>> = HashMap::new();
        let mut visibility: HashMap<&'s str, Visibility> = HashMap::new();
        let mut markers: Vec<(Visibility, Node<'t>)> = Vec::new();
        let mut current = Visibility::Public;

        for stmt in stmts {
            match stmt.kind() {
                "identifier" => {
                    current = match node_text(*stmt, source) {
                        "public" => Visibility::Public,
                        "protected" => Visibility::Protected,
                        "private" => Visibility::Private,
                        _ => continue,
                    };
                    if current != Visibility::Public {
                        markers.push((current, *stmt));
                    }
                }
                "method" => {
                    if let Some(name) = method_name(*stmt, source) {
                        if !defs.contains_key(name) {
                            decl_order.push(name);
                        }
                        // Redefinition wins, original position is kept.
                        defs.insert(name, *stmt);
                        visibility.insert(name, current);
                    }
                }
                _ => {}
            }
        }

        if defs.is_empty() || markers.is_empty() {
            return None;
        }

        let ignore_protected = markers.iter().any(|(v, _)| *v == Visibility::Protected)
            && markers.iter().any(|(v, _)| *v == Visibility::Private);

        let marker = markers
            .iter()
            .find(|(v, _)| !(*v == Visibility::Protected && ignore_protected))
            .map(|(_, node)| *node)?;

        let roots = extract_callback_roots(stmts, &defs, source);

        let mut analysis = Self {
            style,
            source,
            decl_order,
            defs,
            visibility,
            ignore_protected,
            marker,
            reachable: roots.iter().copied().collect(),
            canonical: Vec::new(),
        };

        analysis.canonical = if style == OrderStyle::Alphabetical {
            analysis
                .decl_order
                .iter()
                .copied()
                .filter(|n| analysis.visibility_orderable(n))
                .sorted()
                .collect()
        } else {
            let top = analysis.build_call_tree(&roots);
            analysis.rank(&top)
        };

        Some(analysis)
    }

    fn visibility_orderable(&self, name: &str) -> bool {
        match self.visibility.get(name) {
            Some(Visibility::Private) => true,
            Some(Visibility::Protected) => !self.ignore_protected,
            Some(Visibility::Public) | None => false,
        }
    }

    fn orderable(&self, name: &str) -> bool {
        self.visibility_orderable(name) && self.reachable.contains(name)
    }

    /// Synthetic top node whose children are callback roots followed by every
    /// method in declaration order. Building also accumulates the reachable
    /// set used by the orderable test.
    fn build_call_tree(&mut self, roots: &[&'s str]) -> CallNode<'s> {
        let names: Vec<&'s str> = roots
            .iter()
            .copied()
            .chain(self.decl_order.iter().copied())
            .unique()
            .collect();

        let path = HashSet::new();
        let mut children = Vec::with_capacity(names.len());
        for name in names {
            children.push(build_call_node(
                name,
                &self.defs,
                self.source,
                &path,
                &mut self.reachable,
            ));
        }

        CallNode {
            name: None,
            children,
        }
    }

    /// Flatten the call tree into the expected order. Non-orderable methods
    /// contribute their children but not their own name.
    fn rank(&self, node: &CallNode<'s>) -> Vec<&'s str> {
        let self_name = node.name.filter(|n| self.orderable(n));

        let child_names: Vec<&'s str> = node.children.iter().flat_map(|c| self.rank(c)).collect();

        let common: Vec<&'s str> = if self.style.defers_common_callees() {
            let counts = child_names.iter().copied().counts();
            child_names
                .iter()
                .copied()
                .filter(|n| counts[n] > 1)
                .unique()
                .collect()
        } else {
            Vec::new()
        };

        let common_set: HashSet<&'s str> = common.iter().copied().collect();

        self_name
            .into_iter()
            .chain(
                child_names
                    .iter()
                    .copied()
                    .filter(|n| !common_set.contains(n)),
            )
            .chain(common)
            .unique()
            .collect()
    }

    /// Compare the expected order against declaration order and report the
    /// first method out of place. One mismatch per pass; re-linting after
    /// a correction surfaces the next one.
    fn first_mismatch(&self) -> Option<OrderMismatch<'t, 's>> {
        let canonical_set: HashSet<&'s str> = self.canonical.iter().copied().collect();
        let actual: Vec<&'s str> = self
            .decl_order
            .iter()
            .copied()
            .filter(|n| canonical_set.contains(n))
            .collect();

        for (i, name) in self.canonical.iter().copied().enumerate() {
            if actual.iter().position(|&n| n == name) == Some(i) {
                continue;
            }

            let (previous_name, previous) = if i > 0 {
                let prev = self.canonical[i - 1];
                (prev, self.defs[prev])
            } else {
                (node_text(self.marker, self.source), self.marker)
            };

            return Some(OrderMismatch {
                name,
                method: self.defs[name],
                previous_name,
                previous,
            });
        }

        None
    }
}

/// Methods referenced by Rails-style callback registrations, in source
/// order. Only names that resolve to a definition in the same class count.
fn extract_callback_roots<'t, 's>(
    stmts: &[Node<'t>],
    defs: &HashMap<&'s str, Node<'t>>,
    source: &'s str,
) -> Vec<&'s str> {
    let mut roots = Vec::new();

    for stmt in stmts {
        if stmt.kind() != "call" {
            continue;
        }
        if let Some(callback) = bare_call_name(*stmt, source)
            && is_rails_callback(callback)
            && let Some(name) = first_symbol_arg(*stmt, source)
            && let Some((key, _)) = defs.get_key_value(name)
            && !roots.contains(key)
        {
            roots.push(*key);
        }
    }

    roots
}

const CALLBACK_SUFFIXES: [&str; 8] = [
    "action",
    "validation",
    "create",
    "update",
    "save",
    "destroy",
    "commit",
    "rollback",
];

fn is_rails_callback(name: &str) -> bool {
    if name == "validate" {
        return true;
    }

    let rest = ["before_", "after_", "around_"]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix));

    match rest {
        Some(rest) => CALLBACK_SUFFIXES.iter().any(|s| rest.ends_with(s)),
        None => false,
    }
}

/// Plan the text move that puts the offending method below its expected
/// predecessor. Attached comments and a preceding Sorbet `sig` block travel
/// with the method; blank-line bookkeeping keeps the result tidy.
fn plan_move(source: &str, mismatch: &OrderMismatch<'_, '_>) -> Suggestion {
    let bytes = source.as_bytes();

    // Insertion point: the newline ending the predecessor's last line. When
    // a blank line follows, insert after it so it stays attached to the
    // predecessor.
    let mut insert_at = line_end(source, mismatch.previous.end_byte());
    if insert_at + 1 < source.len() && bytes[insert_at + 1] == b'\n' {
        insert_at += 1;
    }

    // Moved span: from the newline preceding the first attached line
    // (signature block or comment included) through the method's last line.
    let begin_node = signature_before(mismatch.method, source).unwrap_or(mismatch.method);
    let first = first_attached_node(begin_node, source);
    let begin = line_start(source, first.start_byte()).saturating_sub(1);
    let mut end = line_end(source, mismatch.method.end_byte());

    // A blank line above the span means one would be left behind below it;
    // absorb the trailing newline instead.
    if begin > 0 && bytes[begin - 1] == b'\n' {
        end = (end + 1).min(source.len());
    }

    let moved = source[begin..end].to_string();

    Suggestion {
        message: format!(
            "move `{}` below `{}`",
            mismatch.name, mismatch.previous_name
        ),
        edits: vec![
            TextEdit::insert(insert_at, moved),
            TextEdit::delete(begin, end),
        ],
        applicability: Applicability::MachineApplicable,
    }
}

/// A Sorbet `sig { ... }` block directly before the method definition.
fn signature_before<'t>(method: Node<'t>, source: &str) -> Option<Node<'t>> {
    let prev = method.prev_named_sibling()?;

    let is_sig = prev.kind() == "call"
        && prev.child_by_field_name("receiver").is_none()
        && prev.child_by_field_name("block").is_some()
        && prev
            .child_by_field_name("method")
            .is_some_and(|m| node_text(m, source) == "sig");

    is_sig.then_some(prev)
}

/// Walk whole-line comments directly above a node; the earliest one starts
/// the moved span.
fn first_attached_node<'t>(node: Node<'t>, source: &str) -> Node<'t> {
    let mut first = node;

    while let Some(prev) = first.prev_named_sibling() {
        if prev.kind() != "comment" || prev.end_position().row + 1 != first.start_position().row {
            break;
        }
        let ls = line_start(source, prev.start_byte());
        if !source[ls..prev.start_byte()].trim().is_empty() {
            break;
        }
        first = prev;
    }

    first
}

fn build_call_node<'t, 's>(
    name: &'s str,
    defs: &HashMap<&'s str, Node<'t>>,
    source: &'s str,
    path: &HashSet<&'s str>,
    reachable: &mut HashSet<&'s str>,
) -> CallNode<'s> {
    let callees: Vec<&'s str> = called_method_names(defs[name], source)
        .into_iter()
        .filter_map(|n| defs.get_key_value(n).map(|(key, _)| *key))
        .collect();

    reachable.extend(callees.iter().copied());

    let mut next_path = path.clone();
    next_path.insert(name);

    let children = callees
        .iter()
        .filter(|c| !next_path.contains(**c))
        .map(|c| build_call_node(c, defs, source, &next_path, reachable))
        .collect();

    CallNode {
        name: Some(name),
        children,
    }
}

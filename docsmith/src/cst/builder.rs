//! Builds the lossless tree from a tree-sitter parse.
//!
//! The builder owns a single cursor into the source. Every slice it stores
//! starts at the cursor and advances it, so the concatenation of all stored
//! text is the source itself; tree-sitter only decides where to cut.

use tree_sitter::Node;

use super::tree::{
    BlockLayout, DefHeader, ExprKind, NodeId, NodeKind, ParamKind, Parameter, SyntaxElement,
    SyntaxNode,
};
use crate::utils::LineIndex;

pub(crate) struct TreeBuilder<'s> {
    source: &'s str,
    lines: LineIndex,
    pos: usize,
    next_id: u32,
}

impl<'s> TreeBuilder<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            pos: 0,
            next_id: 0,
        }
    }

    /// Consumes the builder, returning the module node and the next free id.
    pub(crate) fn build(mut self, module: Node<'_>) -> (SyntaxNode, u32) {
        let id = self.allocate();
        let mut children = Vec::new();
        for stmt in statements(module) {
            children.push(SyntaxElement::Node(self.statement(stmt, false)));
        }
        let trailing = self.take_until(self.source.len());
        let root = SyntaxNode {
            id,
            kind: NodeKind::Module,
            leading: String::new(),
            children,
            trailing,
            origin: Some(0),
        };
        (root, self.next_id)
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn slice(&self, start: usize, end: usize) -> &'s str {
        self.source.get(start..end).unwrap_or_default()
    }

    fn node_text(&self, node: Node<'_>) -> String {
        self.slice(node.start_byte(), node.end_byte()).to_owned()
    }

    /// Takes the source from the cursor up to `end`.
    fn take_until(&mut self, end: usize) -> String {
        let mut end = end.min(self.source.len());
        if end <= self.pos {
            return String::new();
        }
        while !self.source.is_char_boundary(end) {
            end += 1;
        }
        let text = self.source[self.pos..end].to_owned();
        self.pos = end;
        text
    }

    fn push_token(&mut self, children: &mut Vec<SyntaxElement>, end: usize) {
        let text = self.take_until(end);
        if !text.is_empty() {
            children.push(SyntaxElement::Token(text));
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || matches!(self.source.as_bytes()[self.pos - 1], b'\n' | b'\r')
    }

    /// End of the current line, terminator included, when everything from
    /// the cursor to it is whitespace or a comment.
    fn line_rest_end(&self) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut i = self.pos;
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\x0c') {
            i += 1;
        }
        if bytes.get(i) == Some(&b'#') {
            while i < bytes.len() && !matches!(bytes[i], b'\n' | b'\r') {
                i += 1;
            }
        }
        match bytes.get(i) {
            None => Some(i),
            Some(b'\n') => Some(i + 1),
            Some(b'\r') if bytes.get(i + 1) == Some(&b'\n') => Some(i + 2),
            Some(b'\r') => Some(i + 1),
            Some(_) => None,
        }
    }

    fn take_line_rest(&mut self) -> String {
        if self.at_line_start() {
            return String::new();
        }
        match self.line_rest_end() {
            Some(end) => self.take_until(end),
            None => String::new(),
        }
    }

    /// Whitespace before `start` when it is the first token on its line.
    fn own_line_indent(&self, start: usize) -> Option<String> {
        let line_start = self.lines.line_start(start);
        let prefix = self.slice(line_start, start);
        prefix
            .bytes()
            .all(|b| matches!(b, b' ' | b'\t' | b'\x0c'))
            .then(|| prefix.to_owned())
    }

    fn statement(&mut self, node: Node<'_>, in_class: bool) -> SyntaxNode {
        let origin = self.pos;
        let leading = self.take_until(node.start_byte());
        match node.kind() {
            "function_definition" | "class_definition" => {
                self.definition(node, node, origin, leading, in_class)
            }
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(def) => self.definition(node, def, origin, leading, in_class),
                None => self.plain_statement(node, origin, leading),
            },
            _ => self.plain_statement(node, origin, leading),
        }
    }

    fn plain_statement(&mut self, node: Node<'_>, origin: usize, leading: String) -> SyntaxNode {
        let id = self.allocate();
        let mut suites = Vec::new();
        collect_suites(node, &mut suites);

        let mut children = Vec::new();
        if suites.is_empty() {
            let start = self.pos;
            let text = self.take_until(node.end_byte());
            if is_string_statement(node, self.source) {
                let expr = SyntaxNode {
                    id: self.allocate(),
                    kind: NodeKind::Expression(ExprKind::StringLiteral),
                    leading: String::new(),
                    children: vec![SyntaxElement::Token(text)],
                    trailing: String::new(),
                    origin: Some(start),
                };
                children.push(SyntaxElement::Node(expr));
            } else {
                children.push(SyntaxElement::Token(text));
            }
        } else {
            for (colon_end, suite) in suites {
                self.push_token(&mut children, colon_end.unwrap_or(suite.start_byte()));
                children.push(SyntaxElement::Node(self.block(suite, false)));
            }
            self.push_token(&mut children, node.end_byte());
        }

        let trailing = self.take_line_rest();
        SyntaxNode {
            id,
            kind: NodeKind::Statement,
            leading,
            children,
            trailing,
            origin: Some(origin),
        }
    }

    fn definition(
        &mut self,
        outer: Node<'_>,
        def: Node<'_>,
        origin: usize,
        leading: String,
        in_class: bool,
    ) -> SyntaxNode {
        let id = self.allocate();
        let is_class = def.kind() == "class_definition";
        let header = self.header(outer, def, in_class);

        let mut children = Vec::new();
        if let Some(body) = def.child_by_field_name("body") {
            let colon_end = colon_before(def, body).unwrap_or(body.start_byte());
            self.push_token(&mut children, colon_end);
            children.push(SyntaxElement::Node(self.block(body, is_class)));
        }
        self.push_token(&mut children, outer.end_byte());
        let trailing = self.take_line_rest();

        let kind = if is_class {
            NodeKind::ClassDef(Box::new(header))
        } else {
            NodeKind::FunctionDef(Box::new(header))
        };
        SyntaxNode {
            id,
            kind,
            leading,
            children,
            trailing,
            origin: Some(origin),
        }
    }

    fn block(&mut self, block: Node<'_>, in_class: bool) -> SyntaxNode {
        let id = self.allocate();
        let origin = self.pos;
        let stmts = statements(block);
        let first_start = stmts.first().map_or(block.start_byte(), Node::start_byte);

        // The rest of the header line belongs to the block; the first
        // statement's own indentation belongs to the statement.
        let leading = match self.line_rest_end() {
            Some(end) if end <= first_start => self.take_until(end),
            _ => self.take_until(first_start),
        };
        let body_indent = self.own_line_indent(first_start);

        let children = stmts
            .into_iter()
            .map(|stmt| SyntaxElement::Node(self.statement(stmt, in_class)))
            .collect();

        SyntaxNode {
            id,
            kind: NodeKind::Block(BlockLayout { body_indent }),
            leading,
            children,
            trailing: String::new(),
            origin: Some(origin),
        }
    }

    fn header(&self, outer: Node<'_>, def: Node<'_>, in_class: bool) -> DefHeader {
        let is_class = def.kind() == "class_definition";
        let name = def
            .child_by_field_name("name")
            .map(|n| self.node_text(n))
            .unwrap_or_default();
        let body = def.child_by_field_name("body");
        let colon_end = body
            .and_then(|b| colon_before(def, b))
            .unwrap_or_else(|| def.end_byte());

        let params = def
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let return_annotation = def
            .child_by_field_name("return_type")
            .map(|n| self.node_text(n));
        let bases = def.child_by_field_name("superclasses").map(|n| {
            let text = self.node_text(n);
            text.trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .trim()
                .to_owned()
        });

        let decorators = if outer == def {
            Vec::new()
        } else {
            let mut cursor = outer.walk();
            outer
                .children(&mut cursor)
                .filter(|child| child.kind() == "decorator")
                .map(|child| self.node_text(child))
                .collect()
        };

        let start = def.start_byte();
        let line_start = self.lines.line_start(start);
        let indent: String = self
            .slice(line_start, start)
            .chars()
            .take_while(|c| matches!(c, ' ' | '\t' | '\x0c'))
            .collect();

        let mut references = Vec::new();
        collect_references(def, self.source, &mut references);
        references.retain(|r| *r != name);

        DefHeader {
            is_async: !is_class && has_child_kind(def, "async"),
            is_method: in_class && !is_class,
            signature: self.slice(start, colon_end).to_owned(),
            params,
            return_annotation,
            bases: bases.filter(|b| !b.is_empty()),
            decorators,
            indent,
            line: self.lines.line(start),
            returns_value: !is_class && body.is_some_and(has_value_return),
            references,
            name,
        }
    }

    fn parameters(&self, params: Node<'_>) -> Vec<Parameter> {
        let mut out: Vec<Parameter> = Vec::new();
        let mut keyword_only = false;
        let mut cursor = params.walk();
        let children: Vec<Node<'_>> = params.named_children(&mut cursor).collect();

        for child in children {
            let regular = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::Regular
            };
            let field = |name: &str| child.child_by_field_name(name).map(|n| self.node_text(n));
            match child.kind() {
                "identifier" => out.push(Parameter {
                    name: self.node_text(child),
                    annotation: None,
                    default: None,
                    kind: regular,
                }),
                "default_parameter" | "typed_default_parameter" => out.push(Parameter {
                    name: field("name").unwrap_or_default(),
                    annotation: field("type"),
                    default: field("value"),
                    kind: regular,
                }),
                "typed_parameter" => {
                    let annotation_node = child.child_by_field_name("type");
                    let mut inner = child.walk();
                    let target = child
                        .named_children(&mut inner)
                        .find(|n| Some(*n) != annotation_node && n.kind() != "comment");
                    let annotation = annotation_node.map(|n| self.node_text(n));
                    match target {
                        Some(t) if t.kind() == "list_splat_pattern" => {
                            keyword_only = true;
                            out.push(self.splat(t, annotation, ParamKind::VarPositional));
                        }
                        Some(t) if t.kind() == "dictionary_splat_pattern" => {
                            out.push(self.splat(t, annotation, ParamKind::VarKeyword));
                        }
                        Some(t) => out.push(Parameter {
                            name: self.node_text(t),
                            annotation,
                            default: None,
                            kind: regular,
                        }),
                        None => {}
                    }
                }
                "list_splat_pattern" => {
                    keyword_only = true;
                    out.push(self.splat(child, None, ParamKind::VarPositional));
                }
                "dictionary_splat_pattern" => {
                    out.push(self.splat(child, None, ParamKind::VarKeyword));
                }
                "keyword_separator" => keyword_only = true,
                "positional_separator" => {
                    for param in &mut out {
                        if param.kind == ParamKind::Regular {
                            param.kind = ParamKind::PositionalOnly;
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn splat(&self, node: Node<'_>, annotation: Option<String>, kind: ParamKind) -> Parameter {
        let text = self.node_text(node);
        Parameter {
            name: text.trim_start_matches('*').trim().to_owned(),
            annotation,
            default: None,
            kind,
        }
    }
}

/// Named children that are statements (comments and continuations are trivia).
fn statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "comment" | "line_continuation"))
        .collect()
}

/// Suites of a compound statement in document order, each paired with the
/// end of the colon that introduces it.
fn collect_suites<'t>(node: Node<'t>, out: &mut Vec<(Option<usize>, Node<'t>)>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
    let mut colon = None;
    for child in children {
        match child.kind() {
            ":" => colon = Some(child.end_byte()),
            "block" => out.push((colon.take(), child)),
            kind if kind.ends_with("_clause") => collect_suites(child, out),
            _ => {}
        }
    }
}

fn colon_before(parent: Node<'_>, body: Node<'_>) -> Option<usize> {
    let mut cursor = parent.walk();
    let mut colon = None;
    for child in parent.children(&mut cursor) {
        if child.start_byte() >= body.start_byte() {
            break;
        }
        if child.kind() == ":" {
            colon = Some(child.end_byte());
        }
    }
    colon
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

fn is_string_statement(node: Node<'_>, source: &str) -> bool {
    // `'a',` is a one-element tuple
    if node.kind() != "expression_statement" || has_child_kind(node, ",") {
        return false;
    }
    matches!(statements(node).as_slice(), [value] if is_str_literal(*value, source))
}

fn is_str_literal(node: Node<'_>, source: &str) -> bool {
    match node.kind() {
        "string" => source
            .get(node.start_byte()..node.end_byte())
            .is_some_and(|text| !has_non_str_prefix(text)),
        "concatenated_string" => {
            let parts = statements(node);
            !parts.is_empty() && parts.into_iter().all(|part| is_str_literal(part, source))
        }
        "parenthesized_expression" => {
            matches!(statements(node).as_slice(), [inner] if is_str_literal(*inner, source))
        }
        _ => false,
    }
}

/// f-strings, t-strings and bytes never form a docstring.
fn has_non_str_prefix(literal: &str) -> bool {
    literal
        .chars()
        .take_while(|c| *c != '"' && *c != '\'')
        .any(|c| matches!(c.to_ascii_lowercase(), 'f' | 'b' | 't'))
}

fn has_value_return(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children.into_iter().any(|child| match child.kind() {
        "return_statement" => !statements(child).is_empty(),
        "function_definition" | "class_definition" | "decorated_definition" | "lambda" => false,
        _ => has_value_return(child),
    })
}

fn collect_references(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    let mut push = |n: Node<'_>, out: &mut Vec<String>| {
        if let Some(text) = source.get(n.start_byte()..n.end_byte()) {
            if !out.iter().any(|seen| seen == text) {
                out.push(text.to_owned());
            }
        }
    };

    match node.kind() {
        "call" => {
            if let Some(func) = node.child_by_field_name("function") {
                if func.kind() == "identifier" {
                    push(func, out);
                }
            }
        }
        "type" => {
            let mut names = Vec::new();
            collect_identifiers(node, &mut names);
            for name in names {
                push(name, out);
            }
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    for child in children {
        collect_references(child, source, out);
    }
}

fn collect_identifiers<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    if node.kind() == "identifier" {
        out.push(node);
        return;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    for child in children {
        collect_identifiers(child, out);
    }
}

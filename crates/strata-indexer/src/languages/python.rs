//! Python import extraction using tree-sitter

use std::cell::RefCell;

use strata_core::{ImportKind, ImportRecord};
use tree_sitter::{Node, Parser, Tree};

use super::{ExportKind, ExportRecord, ParsedSource, SourceParser};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

/// Parse with this thread's parser, creating it on first use.
fn parse_tree(source: &str) -> Option<Tree> {
    PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let mut parser = Parser::new();
            let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
            if let Err(e) = parser.set_language(&language) {
                tracing::warn!("Failed to load Python grammar: {}", e);
                return None;
            }
            *slot = Some(parser);
        }
        slot.as_mut()?.parse(source, None)
    })
}

/// Full-grammar parser for Python sources. A file with any syntax error
/// yields an empty, failed result.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonParser;

impl SourceParser for PythonParser {
    fn parse(&self, source: &str) -> ParsedSource {
        let Some(tree) = parse_tree(source) else {
            return ParsedSource::failed();
        };
        let root = tree.root_node();
        if root.has_error() {
            return ParsedSource::failed();
        }

        let src = source.as_bytes();
        let mut parsed = ParsedSource::default();
        collect_imports(root, src, &mut parsed.imports);
        collect_exports(root, src, &mut parsed.exports);
        parsed
    }
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

/// Pre-order walk over the whole tree, so imports inside functions,
/// conditionals and `try` blocks are found too.
fn collect_imports(root: Node, src: &[u8], imports: &mut Vec<ImportRecord>) {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        let descend = match node.kind() {
            "import_statement" => {
                plain_import(node, src, imports);
                false
            }
            "import_from_statement" => {
                from_import(node, src, imports);
                false
            }
            "future_import_statement" => false,
            "call" => {
                if let Some(record) = dynamic_import(node, src) {
                    imports.push(record);
                }
                true
            }
            _ => true,
        };

        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// `import a.b`, `import a.b as c`, `import a, b`
fn plain_import(node: Node, src: &[u8], imports: &mut Vec<ImportRecord>) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let module = match name.kind() {
            "aliased_import" => name.child_by_field_name("name").map(|n| text(n, src)),
            "dotted_name" => Some(text(name, src)),
            _ => None,
        };
        if let Some(module) = module.filter(|m| !m.is_empty()) {
            imports.push(ImportRecord::new(module, ImportKind::Static, line_of(node)));
        }
    }
}

/// `from x import y [as z]`, `from . import y`, `from ..pkg import *`
fn from_import(node: Node, src: &[u8], imports: &mut Vec<ImportRecord>) {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };

    let (module, level) = if module_node.kind() == "relative_import" {
        let mut level = 0;
        let mut dotted = "";
        let mut cursor = module_node.walk();
        for child in module_node.children(&mut cursor) {
            match child.kind() {
                "import_prefix" => level = text(child, src).chars().filter(|c| *c == '.').count(),
                "dotted_name" => dotted = text(child, src),
                _ => {}
            }
        }
        (format!("{}{}", ".".repeat(level), dotted), level)
    } else {
        (text(module_node, src).to_string(), 0)
    };

    let mut symbols = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            symbols.push("*".to_string());
        }
    }
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let symbol = match name.kind() {
            "aliased_import" => name.child_by_field_name("name").map(|n| text(n, src)),
            _ => Some(text(name, src)),
        };
        if let Some(symbol) = symbol.filter(|s| !s.is_empty()) {
            symbols.push(symbol.to_string());
        }
    }

    imports.push(
        ImportRecord::new(module, ImportKind::Static, line_of(node))
            .with_symbols(symbols)
            .with_level(level),
    );
}

/// `importlib.import_module("x")` and `__import__("x")` with a literal
/// first argument.
fn dynamic_import(node: Node, src: &[u8]) -> Option<ImportRecord> {
    let function = node.child_by_field_name("function")?;
    let callee = text(function, src);
    if !matches!(callee, "importlib.import_module" | "import_module" | "__import__") {
        return None;
    }

    let arguments = node.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    let module = string_literal(first, src)?;
    if module.is_empty() {
        return None;
    }

    let level = module.chars().take_while(|c| *c == '.').count();
    Some(ImportRecord::new(module, ImportKind::Dynamic, line_of(node)).with_level(level))
}

/// Contents of a plain string literal. Interpolated strings yield `None`.
fn string_literal(node: Node, src: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut content = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_content" => content.push_str(text(child, src)),
            "interpolation" => return None,
            _ => {}
        }
    }
    Some(content)
}

/// Top-level `def`/`class` names (decorated ones included) and string
/// entries of a module-level `__all__`.
fn collect_exports(root: Node, src: &[u8], exports: &mut Vec<ExportRecord>) {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let definition = if child.kind() == "decorated_definition" {
            child.child_by_field_name("definition")
        } else {
            Some(child)
        };
        let Some(definition) = definition else {
            continue;
        };

        match definition.kind() {
            "function_definition" | "class_definition" => {
                if let Some(name) = definition.child_by_field_name("name") {
                    let kind = if definition.kind() == "class_definition" {
                        ExportKind::Class
                    } else {
                        ExportKind::Function
                    };
                    exports.push(ExportRecord::new(text(name, src), kind, line_of(definition)));
                }
            }
            "expression_statement" => dunder_all(definition, src, exports),
            _ => {}
        }
    }
}

fn dunder_all(statement: Node, src: &[u8], exports: &mut Vec<ExportRecord>) {
    let Some(assignment) = statement.named_child(0) else {
        return;
    };
    if !matches!(assignment.kind(), "assignment" | "augmented_assignment") {
        return;
    }
    let is_all = assignment
        .child_by_field_name("left")
        .is_some_and(|left| text(left, src) == "__all__");
    if !is_all {
        return;
    }
    let Some(value) = assignment.child_by_field_name("right") else {
        return;
    };
    if !matches!(value.kind(), "list" | "tuple") {
        return;
    }

    let mut cursor = value.walk();
    for item in value.named_children(&mut cursor) {
        if let Some(name) = string_literal(item, src) {
            exports.push(ExportRecord::new(name, ExportKind::Named, line_of(item)));
        }
    }
}

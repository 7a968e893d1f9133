//! JavaScript/TypeScript import extraction using line patterns
//!
//! There is no grammar here: statements are recognised by anchored regular
//! expressions over comment-stripped logical lines. Multi-line brace lists
//! (`import {\n a,\n b\n} from 'x'`) are joined into one logical line first.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use strata_core::{ImportKind, ImportRecord};

use super::{ExportKind, ExportRecord, ParsedSource, SourceParser};

const IDENT: &str = r"[A-Za-z_$][\w$]*";

struct Patterns {
    reexport: Regex,
    combined: Regex,
    namespace: Regex,
    named: Regex,
    default: Regex,
    side_effect: Regex,
    require_destructured: Regex,
    require_variable: Regex,
    require_bare: Regex,
    dynamic: Regex,
    export_declaration: Regex,
    export_default: Regex,
    export_list: Regex,
    export_star: Regex,
    commonjs_member: Regex,
    commonjs_module: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let from = r#"\s+from\s+['"]([^'"]+)['"]"#;
        Ok(Patterns {
            reexport: Regex::new(&format!(
                r#"^\s*export\s+(type\s+)?(?:\*(?:\s+as\s+({IDENT}))?|\{{([^}}]*)\}})\s*{from}"#,
                from = from.trim_start_matches(r"\s+")
            ))?,
            combined: Regex::new(&format!(
                r#"^\s*import\s+(type\s+)?({IDENT})\s*,\s*(?:\{{([^}}]*)\}}|\*\s+as\s+({IDENT})){from}"#
            ))?,
            namespace: Regex::new(&format!(
                r#"^\s*import\s+(type\s+)?\*\s+as\s+({IDENT}){from}"#
            ))?,
            named: Regex::new(&format!(r#"^\s*import\s+(type\s+)?\{{([^}}]*)\}}\s*from\s+['"]([^'"]+)['"]"#))?,
            default: Regex::new(&format!(r#"^\s*import\s+(type\s+)?({IDENT}){from}"#))?,
            side_effect: Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#)?,
            require_destructured: Regex::new(
                r#"^\s*(?:const|let|var)\s*\{([^}]*)\}\s*=\s*require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
            )?,
            require_variable: Regex::new(&format!(
                r#"^\s*(?:const|let|var)\s+({IDENT})\s*=\s*require\s*\(\s*['"]([^'"]+)['"]\s*\)"#
            ))?,
            require_bare: Regex::new(r#"(?:^|[=\s(,:;!?&|{\[])require\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
            dynamic: Regex::new(r#"(?:^|[=\s(,:;!?&|{\[])import\s*\(\s*['"]([^'"]+)['"]\s*\)"#)?,
            export_declaration: Regex::new(&format!(
                r"^\s*export\s+(?:declare\s+)?(?:async\s+)?(const|let|var|function\*?|class|abstract\s+class|enum|interface|type|namespace)\s+({IDENT})"
            ))?,
            export_default: Regex::new(&format!(
                r"^\s*export\s+default\s+(?:async\s+)?(?:(?:function\*?|class)\s+({IDENT}))?"
            ))?,
            export_list: Regex::new(r"^\s*export\s+(?:type\s+)?\{([^}]*)\}")?,
            export_star: Regex::new(&format!(r"^\s*export\s+\*(?:\s+as\s+({IDENT}))?\s+from\b"))?,
            commonjs_member: Regex::new(&format!(r"^\s*(?:module\.)?exports\.({IDENT})\s*="))?,
            commonjs_module: Regex::new(r"^\s*module\.exports\s*=[^=]")?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| match Patterns::compile() {
    Ok(patterns) => Some(patterns),
    Err(e) => {
        tracing::warn!("Failed to compile script import patterns: {}", e);
        None
    }
});

/// Line/pattern parser shared by JavaScript and TypeScript.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptParser;

impl SourceParser for ScriptParser {
    fn parse(&self, source: &str) -> ParsedSource {
        let Some(patterns) = PATTERNS.as_ref() else {
            return ParsedSource::failed();
        };

        let mut parsed = ParsedSource::default();
        for (line, statement) in logical_lines(source) {
            scan_imports(patterns, &statement, line, &mut parsed.imports);
            scan_exports(patterns, &statement, line, &mut parsed.exports);
        }
        parsed
    }
}

/// Comment-free statements paired with their 1-based starting line.
fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut out: Vec<(usize, String)> = Vec::new();
    let mut in_block = false;
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in source.lines().enumerate() {
        let Some(code) = strip_comments(raw, &mut in_block) else {
            continue;
        };
        let trimmed = code.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((start, mut joined)) = pending.take() {
            if starts_new_statement(trimmed) {
                // unterminated list; give up on it
                out.push((start, joined));
            } else {
                joined.push(' ');
                joined.push_str(trimmed);
                if trimmed.contains('}') {
                    out.push((start, joined));
                } else {
                    pending = Some((start, joined));
                }
                continue;
            }
        }

        if opens_brace_list(trimmed) {
            pending = Some((idx + 1, trimmed.to_string()));
        } else {
            out.push((idx + 1, trimmed.to_string()));
        }
    }

    if let Some(unterminated) = pending {
        out.push(unterminated);
    }
    out
}

/// True for an `import {`, `export {` or destructuring `require` whose
/// brace list continues on later lines.
fn opens_brace_list(line: &str) -> bool {
    if !line.contains('{') || line.contains('}') {
        return false;
    }
    if line.starts_with("import ") || line.starts_with("import{") {
        return true;
    }
    if let Some(rest) = line.strip_prefix("export") {
        let rest = rest.trim_start();
        let rest = rest.strip_prefix("type").unwrap_or(rest).trim_start();
        return rest.starts_with('{');
    }
    ["const", "let", "var"].iter().any(|kw| {
        line.strip_prefix(kw)
            .is_some_and(|rest| rest.trim_start().starts_with('{'))
    })
}

fn starts_new_statement(line: &str) -> bool {
    line.starts_with("import ") || line.starts_with("export ")
}

/// Drop `//` comments and `/* ... */` spans outside string literals.
/// Returns `None` when the whole line is commentary.
fn strip_comments(line: &str, in_block: &mut bool) -> Option<String> {
    let mut code = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if *in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_block = false;
            }
            continue;
        }
        if let Some(q) = quote {
            code.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    code.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                code.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                *in_block = true;
                code.push(' ');
            }
            '/' if chars.peek() == Some(&'/') => break,
            _ => code.push(c),
        }
    }

    if code.trim().is_empty() {
        None
    } else {
        Some(code)
    }
}

/// True when byte offset `pos` of `statement` falls inside a string literal,
/// quotes included.
fn in_string_literal(statement: &str, pos: usize) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in statement.char_indices() {
        if idx >= pos {
            return quote.is_some() || matches!(c, '\'' | '"' | '`');
        }
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None => {}
        }
    }
    false
}

/// Names from a `{ a, b as c, type d }` list: the source-side name of each
/// entry when `alias` is false, the local alias when it is true.
fn brace_names(list: &str, alias: bool) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| entry.strip_prefix("type ").unwrap_or(entry).trim())
        .map(|entry| match entry.split_once(" as ") {
            Some((name, local)) => {
                if alias {
                    local.trim().to_string()
                } else {
                    name.trim().to_string()
                }
            }
            None => entry.to_string(),
        })
        .collect()
}

fn group(caps: &Captures, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

fn scan_imports(p: &Patterns, statement: &str, line: usize, imports: &mut Vec<ImportRecord>) {
    if let Some(record) = es_import(p, statement, line) {
        imports.push(record);
    }

    if let Some(caps) = p.require_destructured.captures(statement) {
        if let Some(module) = group(&caps, 2) {
            let symbols = group(&caps, 1)
                .map(|list| brace_names(&list.replace(':', " as "), false))
                .unwrap_or_default();
            imports.push(ImportRecord::new(module, ImportKind::Require, line).with_symbols(symbols));
        }
    } else if let Some(caps) = p.require_variable.captures(statement) {
        if let (Some(name), Some(module)) = (group(&caps, 1), group(&caps, 2)) {
            imports.push(ImportRecord::new(module, ImportKind::Require, line).with_symbols(vec![name]));
        }
    } else {
        for caps in p.require_bare.captures_iter(statement) {
            if caps.get(0).is_some_and(|m| in_string_literal(statement, m.start())) {
                continue;
            }
            if let Some(module) = group(&caps, 1) {
                imports.push(ImportRecord::new(module, ImportKind::Require, line));
            }
        }
    }

    for caps in p.dynamic.captures_iter(statement) {
        if caps.get(0).is_some_and(|m| in_string_literal(statement, m.start())) {
            continue;
        }
        if let Some(module) = group(&caps, 1) {
            imports.push(ImportRecord::new(module, ImportKind::Dynamic, line));
        }
    }
}

/// First matching static form, tried from most to least specific.
fn es_import(p: &Patterns, statement: &str, line: usize) -> Option<ImportRecord> {
    let finish = |module: Option<String>, kind, symbols: Vec<String>, type_only: bool| {
        let record = ImportRecord::new(module?, kind, line).with_symbols(symbols);
        Some(if type_only { record.type_only() } else { record })
    };

    if let Some(caps) = p.reexport.captures(statement) {
        let symbols = match group(&caps, 3) {
            Some(list) => brace_names(&list, false),
            None => vec!["*".to_string()],
        };
        return finish(group(&caps, 4), ImportKind::ReExport, symbols, caps.get(1).is_some());
    }
    if let Some(caps) = p.combined.captures(statement) {
        let mut symbols: Vec<String> = group(&caps, 2).into_iter().collect();
        match (group(&caps, 3), group(&caps, 4)) {
            (Some(list), _) => symbols.extend(brace_names(&list, false)),
            (None, Some(_)) => symbols.push("*".to_string()),
            (None, None) => {}
        }
        return finish(group(&caps, 5), ImportKind::Static, symbols, caps.get(1).is_some());
    }
    if let Some(caps) = p.namespace.captures(statement) {
        return finish(group(&caps, 3), ImportKind::Static, vec!["*".to_string()], caps.get(1).is_some());
    }
    if let Some(caps) = p.named.captures(statement) {
        let list = group(&caps, 2).unwrap_or_default();
        let symbols = brace_names(&list, false);
        // `import { type A, type B }` erases just like `import type { A, B }`
        let all_types = !symbols.is_empty()
            && list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .all(|s| s.starts_with("type "));
        return finish(group(&caps, 3), ImportKind::Static, symbols, caps.get(1).is_some() || all_types);
    }
    if let Some(caps) = p.default.captures(statement) {
        let symbols = group(&caps, 2).into_iter().collect();
        return finish(group(&caps, 3), ImportKind::Static, symbols, caps.get(1).is_some());
    }
    if let Some(caps) = p.side_effect.captures(statement) {
        return finish(group(&caps, 1), ImportKind::Static, Vec::new(), false);
    }
    None
}

fn scan_exports(p: &Patterns, statement: &str, line: usize, exports: &mut Vec<ExportRecord>) {
    if let Some(caps) = p.export_star.captures(statement) {
        let name = group(&caps, 1).unwrap_or_else(|| "*".to_string());
        exports.push(ExportRecord::new(name, ExportKind::ReExport, line));
    } else if let Some(caps) = p.export_default.captures(statement) {
        let name = group(&caps, 1).unwrap_or_else(|| "default".to_string());
        exports.push(ExportRecord::new(name, ExportKind::Default, line));
    } else if let Some(caps) = p.export_declaration.captures(statement) {
        if let (Some(keyword), Some(name)) = (group(&caps, 1), group(&caps, 2)) {
            let kind = if keyword.starts_with("function") {
                ExportKind::Function
            } else if keyword.ends_with("class") {
                ExportKind::Class
            } else {
                ExportKind::Variable
            };
            exports.push(ExportRecord::new(name, kind, line));
        }
    } else if let Some(caps) = p.export_list.captures(statement) {
        let kind = if p.reexport.is_match(statement) {
            ExportKind::ReExport
        } else {
            ExportKind::Named
        };
        for name in group(&caps, 1).map(|l| brace_names(&l, true)).unwrap_or_default() {
            exports.push(ExportRecord::new(name, kind, line));
        }
    } else if let Some(caps) = p.commonjs_member.captures(statement) {
        if let Some(name) = group(&caps, 1) {
            exports.push(ExportRecord::new(name, ExportKind::CommonJs, line));
        }
    } else if p.commonjs_module.is_match(statement) {
        exports.push(ExportRecord::new("default", ExportKind::CommonJs, line));
    }
}

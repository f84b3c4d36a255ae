//! Annotation Eraser.
//!
//! An ordered sequence of best-effort text substitutions, not a parser: the
//! input is always close to the target language, so a lightweight pass covers
//! the generated patterns at a fraction of the cost. Order matters:
//!
//! 1. Extract and remove import statements, recording the names they bound.
//! 2. Rewrite export syntax while keeping the declarations.
//! 3. Erase static-type-only constructs (aliases, interfaces, annotations,
//!    assertions, enums).
//!
//! Parameter annotations are only rewritten inside detected parameter lists
//! (the balanced parens of a `function` head or ahead of a `=>`), so object
//! literals elsewhere keep their `key: value` entries.
//!
//! Every rule is a no-op on non-matching input and never fails. Residual
//! syntax that survives is rejected by the in-sandbox compiler and reported
//! as a structured compile failure, not a pipeline fault.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Reserved internal name a non-declaration default export is assigned to.
/// Checked first during root resolution in the sandbox.
pub const DEFAULT_EXPORT_NAME: &str = "__DEFAULT_EXPORT__";

/// Modules the sandbox always provides; their imports are removed without
/// producing stub-relevant records.
const PLATFORM_MODULES: &[&str] = &["react", "react-dom", "react-dom/client", "react/jsx-runtime"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Default,
    Named,
    Namespace,
}

/// One name bound by a removed import statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// The name visible in the module body (the alias when one was used).
    pub local_name: String,
    /// The exported name on the source module, for named imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_name: Option<String>,
    pub module_path: String,
    pub kind: ImportKind,
}

/// Output of one erasure pass.
#[derive(Debug, Clone)]
pub struct ErasedSource {
    pub source: String,
    pub imports: Vec<ImportRecord>,
    /// Name of the entry's default export, when the source declared one.
    pub default_alias: Option<String>,
}

lazy_static! {
    static ref IMPORT_FROM_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*import\s+(type\s+)?([^;'"]+?)\s+from\s*['"]([^'"]+)['"]\s*;?[ \t]*\r?\n?"#
    )
    .unwrap();
    static ref IMPORT_SIDE_EFFECT_RE: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s*['"][^'"]+['"]\s*;?[ \t]*\r?\n?"#).unwrap();

    static ref EXPORT_DEFAULT_DECL_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?function|class)\s+([A-Za-z_$][\w$]*)"
    )
    .unwrap();
    static ref EXPORT_DEFAULT_IDENT_RE: Regex =
        Regex::new(r"(?m)^[ \t]*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?[ \t]*$").unwrap();
    static ref EXPORT_DEFAULT_EXPR_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap();
    static ref EXPORT_DECL_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+((?:async\s+)?function\b|const\b|let\b|var\b|class\b|enum\b|interface\b|type\b)"
    )
    .unwrap();
    static ref EXPORT_LIST_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*export\s+(?:type\s+)?\{[^}]*\}\s*(?:from\s*['"][^'"]+['"])?\s*;?[ \t]*\r?\n?"#
    )
    .unwrap();
    static ref EXPORT_STAR_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*export\s+\*(?:\s+as\s+[\w$]+)?\s+from\s*['"][^'"]+['"]\s*;?[ \t]*\r?\n?"#
    )
    .unwrap();

    static ref INTERFACE_HEAD_RE: Regex =
        Regex::new(r"(?m)^[ \t]*interface\s+[A-Za-z_$][\w$]*[^\{\n]*\{").unwrap();
    static ref TYPE_ALIAS_HEAD_RE: Regex =
        Regex::new(r"(?m)^[ \t]*type\s+[A-Za-z_$][\w$]*(?:<[^>\n]*>)?\s*=").unwrap();
    static ref ENUM_HEAD_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)\s*\{").unwrap();
    static ref DECLARE_LINE_RE: Regex =
        Regex::new(r"(?m)^[ \t]*declare\s+[^\n{]*;?[ \t]*\r?\n?").unwrap();

    static ref AS_ASSERTION_RE: Regex = Regex::new(
        r"\s+as\s+(?:const\b|[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?(?:\[\])*)"
    )
    .unwrap();
    static ref SATISFIES_RE: Regex =
        Regex::new(r"\s+satisfies\s+[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?").unwrap();
    static ref GENERIC_CALL_RE: Regex =
        Regex::new(r"\b([A-Za-z_$][\w$]*)<(?:[^<>\n]|<[^<>\n]*>)*>\(").unwrap();
    static ref VAR_ANNOTATION_RE: Regex = Regex::new(
        r"\b(const|let|var)\s+([A-Za-z_$][\w$]*)\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?(?:\[\])*(?:\s*\|\s*[A-Za-z_$][\w$.]*)*\s*="
    )
    .unwrap();
    static ref RETURN_ANNOTATION_RE: Regex = Regex::new(
        r"\)\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?(?:\[\])*\s*(\{|=>)"
    )
    .unwrap();
    static ref IMPLEMENTS_RE: Regex = Regex::new(
        r"(\bclass\s+[A-Za-z_$][\w$]*(?:\s+extends\s+[A-Za-z_$][\w$.]*)?)\s+implements\s+[^\{\n]+\{"
    )
    .unwrap();
    static ref NON_NULL_RE: Regex = Regex::new(r"([\w$\)\]])!([.\);,])").unwrap();

    // Applied only inside parameter-list segments.
    static ref PARAM_ANNOTATION_RE: Regex = Regex::new(
        r"([(,]\s*)([A-Za-z_$][\w$]*)\??\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?(?:\[\])*(?:\s*\|\s*[A-Za-z_$][\w$.]*)*"
    )
    .unwrap();
    static ref DESTRUCTURE_ANNOTATION_RE: Regex = Regex::new(
        r"([}\]])\s*:\s*[A-Za-z_$][\w$.]*(?:<(?:[^<>\n]|<[^<>\n]*>)*>)?(?:\[\])*"
    )
    .unwrap();
    static ref OPTIONAL_PARAM_RE: Regex =
        Regex::new(r"([A-Za-z_$][\w$]*)\?(\s*[,)=])").unwrap();

    static ref FUNCTION_HEAD_RE: Regex =
        Regex::new(r"\bfunction\b(?:\s+[A-Za-z_$][\w$]*)?\s*\(").unwrap();
}

/// Run the full erasure chain over a merged source.
pub fn erase(source: &str) -> ErasedSource {
    let mut imports = Vec::new();
    let stripped = strip_imports(source, &mut imports);
    let (exported, default_alias) = rewrite_exports(&stripped);
    let erased = erase_types(&exported);

    ErasedSource {
        source: erased,
        imports,
        default_alias,
    }
}

fn is_platform_module(module: &str) -> bool {
    PLATFORM_MODULES.contains(&module) || module.starts_with("react/")
}

// ═══════════════════════════════════════════════════════════════════════════════
// RULE 1: IMPORT EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

fn strip_imports(source: &str, records: &mut Vec<ImportRecord>) -> String {
    let without_from = IMPORT_FROM_RE.replace_all(source, |caps: &Captures| {
        let type_only = caps.get(1).is_some();
        let clause = caps[2].trim();
        let module = &caps[3];
        if !type_only && !is_platform_module(module) {
            parse_import_clause(clause, module, records);
        }
        String::new()
    });

    IMPORT_SIDE_EFFECT_RE
        .replace_all(&without_from, "")
        .to_string()
}

/// Split an import clause into the names it binds, aliasing respected.
/// Handles `Foo`, `{ A, B as C }`, `Foo, { A }`, `* as NS` and the
/// `Foo, * as NS` combination.
fn parse_import_clause(clause: &str, module: &str, records: &mut Vec<ImportRecord>) {
    let mut rest = clause.trim();

    // Leading default binding.
    if !rest.starts_with('{') && !rest.starts_with('*') {
        let default_end = rest.find(',').unwrap_or(rest.len());
        let default_name = rest[..default_end].trim();
        if is_identifier(default_name) {
            records.push(ImportRecord {
                local_name: default_name.to_string(),
                imported_name: None,
                module_path: module.to_string(),
                kind: ImportKind::Default,
            });
        }
        rest = rest[default_end..].trim_start_matches(',').trim();
    }

    if let Some(ns) = rest.strip_prefix('*') {
        if let Some(local) = ns.trim().strip_prefix("as") {
            let local = local.trim();
            if is_identifier(local) {
                records.push(ImportRecord {
                    local_name: local.to_string(),
                    imported_name: None,
                    module_path: module.to_string(),
                    kind: ImportKind::Namespace,
                });
            }
        }
        return;
    }

    let Some(body) = rest
        .strip_prefix('{')
        .and_then(|r| r.trim_end().strip_suffix('}'))
    else {
        return;
    };

    for spec in body.split(',') {
        let spec = spec.trim();
        if spec.is_empty() || spec.starts_with("type ") {
            continue;
        }
        let (imported, local) = match spec.split_once(" as ") {
            Some((imported, local)) => (imported.trim(), local.trim()),
            None => (spec, spec),
        };
        if is_identifier(local) {
            records.push(ImportRecord {
                local_name: local.to_string(),
                imported_name: Some(imported.to_string()),
                module_path: module.to_string(),
                kind: ImportKind::Named,
            });
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

// ═══════════════════════════════════════════════════════════════════════════════
// RULE 2: EXPORT REWRITES
// ═══════════════════════════════════════════════════════════════════════════════

fn rewrite_exports(source: &str) -> (String, Option<String>) {
    // The merged source may carry one default export per original file; the
    // entry is last, so the last recognized name wins as the alias.
    let mut default_alias: Option<(usize, String)> = None;
    for caps in EXPORT_DEFAULT_DECL_RE.captures_iter(source) {
        let m = caps.get(0).unwrap();
        default_alias = Some((m.start(), caps[3].to_string()));
    }
    for caps in EXPORT_DEFAULT_IDENT_RE.captures_iter(source) {
        let m = caps.get(0).unwrap();
        let name = caps[1].to_string();
        if is_declared(source, &name) {
            match &default_alias {
                Some((at, _)) if *at > m.start() => {}
                _ => default_alias = Some((m.start(), name)),
            }
        }
    }

    // `export default function X` -> `function X`, same for classes.
    let out = EXPORT_DEFAULT_DECL_RE.replace_all(source, "$1$2 $3");

    // A bare re-export of an already-declared name is dropped outright.
    let out = EXPORT_DEFAULT_IDENT_RE.replace_all(&out, |caps: &Captures| {
        let name = &caps[1];
        if is_declared(source, name) {
            String::new()
        } else {
            // Unknown identifier: treat like any other expression.
            format!("const {} = {};", DEFAULT_EXPORT_NAME, name)
        }
    });

    // Any remaining default export is an expression: bind it to the
    // reserved internal name.
    let out = EXPORT_DEFAULT_EXPR_RE.replace_all(&out, |caps: &Captures| {
        format!("{}const {} = ", &caps[1], DEFAULT_EXPORT_NAME)
    });

    // Strip `export` from named declarations, drop list/star re-exports.
    let out = EXPORT_DECL_RE.replace_all(&out, "$1$2");
    let out = EXPORT_LIST_RE.replace_all(&out, "");
    let out = EXPORT_STAR_RE.replace_all(&out, "");

    (out.to_string(), default_alias.map(|(_, name)| name))
}

/// Whether `name` is declared somewhere in the source text.
pub fn is_declared(source: &str, name: &str) -> bool {
    let pattern = format!(
        r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:(?:async\s+)?function|class|const|let|var)\s+{}\b",
        regex::escape(name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(source))
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RULE 3: TYPE ERASURE
// ═══════════════════════════════════════════════════════════════════════════════

fn erase_types(source: &str) -> String {
    let out = remove_balanced_blocks(source, &INTERFACE_HEAD_RE);
    let out = remove_type_aliases(&out);
    let out = rewrite_enums(&out);
    let out = DECLARE_LINE_RE.replace_all(&out, "").to_string();

    let out = IMPLEMENTS_RE.replace_all(&out, "$1 {").to_string();
    let out = VAR_ANNOTATION_RE.replace_all(&out, "$1 $2 =").to_string();
    let out = strip_param_annotations(&out);
    let out = RETURN_ANNOTATION_RE.replace_all(&out, ") $1").to_string();
    let out = GENERIC_CALL_RE.replace_all(&out, "$1(").to_string();
    let out = AS_ASSERTION_RE.replace_all(&out, "").to_string();
    let out = SATISFIES_RE.replace_all(&out, "").to_string();
    NON_NULL_RE.replace_all(&out, "$1$2").to_string()
}

fn rewrite_enums(source: &str) -> String {
    let mut out = String::new();
    let mut cursor = 0;

    while let Some(caps) = ENUM_HEAD_RE.captures_at(source, cursor) {
        let m = caps.get(0).unwrap();
        let indent = caps[1].to_string();
        let name = caps[2].to_string();
        let Some(body_end) = find_balanced_brace_end(source, m.end() - 1) else {
            break;
        };

        out.push_str(&source[cursor..m.start()]);
        let body = &source[m.end()..body_end - 1];
        out.push_str(&format!(
            "{}const {} = {{ {} }};",
            indent,
            name,
            enum_members(body)
        ));
        cursor = body_end;
        // Swallow a trailing semicolon left over from `const enum X {...};`.
        if source[cursor..].starts_with(';') {
            cursor += 1;
        }
    }

    out.push_str(&source[cursor..]);
    out
}

/// Rewrite enum members as object entries; an unset member defaults to its
/// own name as a string.
fn enum_members(body: &str) -> String {
    body.split(',')
        .filter_map(|member| {
            let member = member.trim();
            if member.is_empty() {
                return None;
            }
            Some(match member.split_once('=') {
                Some((key, value)) => format!("{}: {}", key.trim(), value.trim()),
                None => format!("{}: \"{}\"", member, member),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn remove_type_aliases(source: &str) -> String {
    let mut out = String::new();
    let mut cursor = 0;

    while let Some(m) = TYPE_ALIAS_HEAD_RE.find_at(source, cursor) {
        out.push_str(&source[cursor..m.start()]);
        cursor = skip_to_statement_end(source, m.end());
    }

    out.push_str(&source[cursor..]);
    out
}

/// Rewrite annotations only inside parameter lists: the balanced parens of a
/// `function` head or the ones directly ahead of a `=>`. Object literals in
/// expression position keep their `key: value` entries this way.
fn strip_param_annotations(source: &str) -> String {
    let mut segments: Vec<(usize, usize)> = Vec::new();

    for m in FUNCTION_HEAD_RE.find_iter(source) {
        if let Some(end) = find_balanced_paren_end(source, m.end() - 1) {
            segments.push((m.end() - 1, end));
        }
    }

    // Arrow parameter lists: a `)` directly before `=>` closes one.
    let mut search = 0;
    while let Some(found) = source[search..].find("=>") {
        let arrow_at = search + found;
        search = arrow_at + 2;
        let before = source[..arrow_at].trim_end();
        if before.ends_with(')') {
            let close = before.len() - 1;
            if let Some(open) = find_paren_open(source, close) {
                segments.push((open, close + 1));
            }
        }
    }

    if segments.is_empty() {
        return source.to_string();
    }

    segments.sort();
    segments.dedup();

    let mut out = String::new();
    let mut cursor = 0;
    for (start, end) in segments {
        if start < cursor {
            continue; // nested inside an already-processed list
        }
        out.push_str(&source[cursor..start]);
        let params = &source[start..end];
        let rewritten = PARAM_ANNOTATION_RE.replace_all(params, "$1$2");
        let rewritten = DESTRUCTURE_ANNOTATION_RE.replace_all(&rewritten, "$1");
        let rewritten = OPTIONAL_PARAM_RE.replace_all(&rewritten, "$1$2");
        out.push_str(&rewritten);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Advance past a type alias right-hand side: ends at the first `;` at
/// bracket depth zero, or at a newline that does not visibly continue the
/// alias (semicolon-less declarations must not swallow the next statement).
fn skip_to_statement_end(source: &str, start: usize) -> usize {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut last_glyph = '=';
    let mut iter = source[start..].char_indices();

    while let Some((offset, c)) = iter.next() {
        if let Some(quote) = in_string {
            if c == '\\' {
                iter.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            ';' if depth <= 0 => return start + offset + 1,
            '\n' if depth <= 0 && !matches!(last_glyph, '=' | '|' | '&' | '<' | ',' | '(') => {
                // A following `|` or `&` line keeps a multi-line union going.
                let next_glyph = source[start + offset + 1..]
                    .chars()
                    .find(|c| !c.is_whitespace());
                if !matches!(next_glyph, Some('|') | Some('&')) {
                    return start + offset;
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            last_glyph = c;
        }
    }
    source.len()
}

/// Remove every block whose head matches `head_re`, including the balanced
/// `{...}` body and a trailing newline.
fn remove_balanced_blocks(source: &str, head_re: &Regex) -> String {
    let mut out = String::new();
    let mut cursor = 0;

    while let Some(m) = head_re.find_at(source, cursor) {
        let Some(body_end) = find_balanced_brace_end(source, m.end() - 1) else {
            break;
        };
        out.push_str(&source[cursor..m.start()]);
        cursor = body_end;
        if source[cursor..].starts_with('\n') {
            cursor += 1;
        }
    }

    out.push_str(&source[cursor..]);
    out
}

/// Find the byte index just past the brace that balances the one at
/// `open_index`. String literals are skipped.
pub fn find_balanced_brace_end(source: &str, open_index: usize) -> Option<usize> {
    scan_balanced(source, open_index, '{', '}')
}

/// Same as [`find_balanced_brace_end`] for parens.
fn find_balanced_paren_end(source: &str, open_index: usize) -> Option<usize> {
    scan_balanced(source, open_index, '(', ')')
}

fn scan_balanced(source: &str, open_index: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut iter = source[open_index..].char_indices();

    while let Some((offset, c)) = iter.next() {
        if let Some(quote) = in_string {
            if c == '\\' {
                iter.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            in_string = Some(c);
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_index + offset + 1);
            }
        }
    }
    None
}

/// Walk backwards from a closing paren to its opening one.
fn find_paren_open(source: &str, close_index: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (idx, c) in source[..=close_index].char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

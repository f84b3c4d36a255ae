//! Project Assembler.
//!
//! Resolves an unpredictable multi-file project description into one
//! executable program: pick the entry file by priority search over
//! conventional paths, separate helper files from the entry, and concatenate
//! them with the entry last so it may reference anything above it.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::PreviewError;
use crate::snapshot::{extension, file_name, file_stem, ProjectSnapshot};

/// Conventional entry paths, highest priority first. First present wins;
/// ties are broken by this order, never by path sort order.
pub const ENTRY_CANDIDATES: &[&str] = &[
    "App.tsx",
    "src/App.tsx",
    "app.tsx",
    "App.jsx",
    "src/App.jsx",
    "app/page.tsx",
    "src/app/page.tsx",
    "pages/index.tsx",
    "pages/index.jsx",
    "index.tsx",
    "src/index.tsx",
    "App.js",
    "src/App.js",
    "index.js",
    "src/index.js",
];

/// Root component names the bootstrap tries when nothing better is known.
pub const COMMON_ROOT_NAMES: &[&str] = &["App", "Home", "Page", "Main", "Index", "Root"];

lazy_static! {
    /// A file "defines something" when it declares a function, const/let/var,
    /// class, or carries an export keyword. Style and config files fail this.
    static ref DEFINITION_MARKER_RE: Regex = Regex::new(
        r"(?m)^\s*(?:export\s|(?:async\s+)?function\s+[A-Za-z_$]|(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=|class\s+[A-Za-z_$])"
    )
    .unwrap();

    /// Any default export marks a file as a possible entry.
    static ref DEFAULT_EXPORT_RE: Regex =
        Regex::new(r"(?m)^\s*export\s+default\b").unwrap();

    /// Named default-export forms the entry component name is read from.
    static ref DEFAULT_EXPORT_NAME_RE: Regex = Regex::new(
        r"(?m)^\s*export\s+default\s+(?:async\s+)?(?:function|class)\s+([A-Z][\w$]*)"
    )
    .unwrap();

    /// Bare `export default Name;` re-export.
    static ref DEFAULT_EXPORT_IDENT_RE: Regex =
        Regex::new(r"(?m)^\s*export\s+default\s+([A-Z][\w$]*)\s*;?\s*$").unwrap();

    /// First capitalized declaration, the last-resort component name guess.
    static ref FIRST_COMPONENT_DECL_RE: Regex = Regex::new(
        r"(?m)^\s*(?:export\s+)?(?:(?:async\s+)?function\s+([A-Z][\w$]*)|const\s+([A-Z][\w$]*)\s*(?::[^=\n]+)?=)"
    )
    .unwrap();
}

/// The assembled program: merged text plus what was learned about the entry.
#[derive(Debug, Clone)]
pub struct MergedProgram {
    /// Helper files first (layout-named pulled to the front), entry last.
    pub source: String,
    /// Path of the resolved entry file; `None` when the raw fallback string
    /// was used.
    pub entry_path: Option<String>,
    /// Component name the entry exports, when one was recognizable. Injected
    /// into the bootstrap's root-resolution list.
    pub entry_component: Option<String>,
}

/// Assemble the snapshot into one program. The only error is an empty
/// snapshot with an empty fallback, which is a caller error by contract.
pub fn assemble(snapshot: &ProjectSnapshot) -> Result<MergedProgram, PreviewError> {
    if snapshot.is_empty() {
        return Err(PreviewError::EmptySnapshot);
    }

    let candidates: Vec<(&str, &str)> = snapshot
        .files()
        .iter()
        .filter(|(path, content)| is_component_candidate(path, content))
        .map(|(path, content)| (path.as_str(), content.as_str()))
        .collect();

    let entry_path = resolve_entry(snapshot, &candidates);

    let Some(entry_path) = entry_path else {
        // No entry among the files: degrade to the fallback string.
        let Some(fallback) = snapshot.fallback() else {
            return Err(PreviewError::EmptySnapshot);
        };
        if !snapshot.files().is_empty() {
            warn!("no entry file resolvable, degrading to fallback source");
        }
        return Ok(MergedProgram {
            source: fallback.to_string(),
            entry_path: None,
            entry_component: detect_entry_component(fallback),
        });
    };

    let entry_content = snapshot.get(&entry_path).unwrap_or_default();

    // Helpers keep snapshot order, except layout-named files move to the
    // front so anything below may reference them.
    let mut layouts: Vec<&str> = Vec::new();
    let mut helpers: Vec<&str> = Vec::new();
    for (path, content) in candidates.iter().copied() {
        if path == entry_path {
            continue;
        }
        if is_layout_named(path) {
            layouts.push(content);
        } else {
            helpers.push(content);
        }
    }

    let mut parts: Vec<&str> = Vec::with_capacity(layouts.len() + helpers.len() + 1);
    parts.extend(layouts);
    parts.extend(helpers);
    parts.push(entry_content);

    let entry_component = detect_entry_component(entry_content);
    debug!(
        entry = %entry_path,
        component = entry_component.as_deref().unwrap_or("<none>"),
        helpers = parts.len() - 1,
        "assembled project snapshot"
    );

    Ok(MergedProgram {
        source: parts.join("\n\n"),
        entry_path: Some(entry_path),
        entry_component,
    })
}

fn resolve_entry(snapshot: &ProjectSnapshot, candidates: &[(&str, &str)]) -> Option<String> {
    // Priority search over the conventional paths.
    for candidate in ENTRY_CANDIDATES {
        if snapshot.get(candidate).is_some() {
            return Some((*candidate).to_string());
        }
    }

    // Otherwise any candidate with a recognizable root-component export.
    candidates
        .iter()
        .find(|(_, content)| DEFAULT_EXPORT_RE.is_match(content))
        .map(|(path, _)| (*path).to_string())
}

/// A file qualifies for merging when its extension is in the
/// component-language family, it is not an infrastructure file, and it
/// defines something.
pub fn is_component_candidate(path: &str, content: &str) -> bool {
    let Some(ext) = extension(path) else {
        return false;
    };
    if !matches!(ext.as_str(), "tsx" | "jsx" | "ts" | "js") {
        return false;
    }
    if is_infrastructure_path(path) {
        return false;
    }
    DEFINITION_MARKER_RE.is_match(content)
}

/// App shells, global layouts and document wrappers never participate in the
/// merge: they bootstrap a real build pipeline, not a component tree.
pub fn is_infrastructure_path(path: &str) -> bool {
    let name = file_name(path);
    let stem = file_stem(path).to_ascii_lowercase();

    if matches!(stem.as_str(), "main" | "_app" | "_document" | "vite-env") {
        return true;
    }
    // Next-style root layout: app/layout.* or src/app/layout.*.
    if stem == "layout" && (path.starts_with("app/") || path.starts_with("src/app/")) {
        return true;
    }
    name.ends_with(".config.ts") || name.ends_with(".config.js") || name.ends_with(".d.ts")
}

/// Layout-named helper components are emitted first among the helpers.
fn is_layout_named(path: &str) -> bool {
    file_stem(path).to_ascii_lowercase().contains("layout")
}

/// Read the root component name out of an entry file, in priority order:
/// named default export, bare default re-export, first capitalized
/// declaration.
pub fn detect_entry_component(content: &str) -> Option<String> {
    if let Some(caps) = DEFAULT_EXPORT_NAME_RE.captures(content) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = DEFAULT_EXPORT_IDENT_RE.captures(content) {
        return Some(caps[1].to_string());
    }
    FIRST_COMPONENT_DECL_RE.captures(content).map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot(files: &[(&str, &str)]) -> ProjectSnapshot {
        let mut s = ProjectSnapshot::new();
        for (path, content) in files {
            s.insert(*path, *content);
        }
        s
    }

    #[test]
    fn test_entry_priority_search_first_present_wins() {
        let s = snapshot(&[
            ("index.tsx", "export default function Index() {}"),
            ("src/App.tsx", "export default function App() {}"),
        ]);
        let merged = assemble(&s).unwrap();
        // src/App.tsx is earlier in the candidate list than index.tsx.
        assert_eq!(merged.entry_path.as_deref(), Some("src/App.tsx"));
        assert_eq!(merged.entry_component.as_deref(), Some("App"));
    }

    #[test]
    fn test_entry_resolution_is_deterministic() {
        let s = snapshot(&[
            ("components/Header.tsx", "export function Header() {}"),
            ("App.tsx", "export default function App() {}"),
        ]);
        let first = assemble(&s).unwrap();
        let second = assemble(&s).unwrap();
        assert_eq!(first.entry_path, second.entry_path);
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn test_helper_emitted_before_entry() {
        let s = snapshot(&[
            ("components/Header.tsx", "function Header() { return null; }\nexport default Header;"),
            ("App.tsx", "export default function App() { return <Header/>; }"),
        ]);
        let merged = assemble(&s).unwrap();
        let header_at = merged.source.find("function Header").unwrap();
        let app_at = merged.source.find("function App").unwrap();
        assert!(header_at < app_at, "helpers must precede the entry");
    }

    #[test]
    fn test_layout_named_files_pulled_to_front() {
        let s = snapshot(&[
            ("components/Card.tsx", "export function Card() {}"),
            ("components/PageLayout.tsx", "export function PageLayout() {}"),
            ("App.tsx", "export default function App() {}"),
        ]);
        let merged = assemble(&s).unwrap();
        let layout_at = merged.source.find("PageLayout").unwrap();
        let card_at = merged.source.find("function Card").unwrap();
        assert!(layout_at < card_at);
    }

    #[test]
    fn test_default_export_fallback_when_no_conventional_path() {
        let s = snapshot(&[
            ("components/Widget.tsx", "export function Widget() {}"),
            ("screens/Dashboard.tsx", "export default function Dashboard() {}"),
        ]);
        let merged = assemble(&s).unwrap();
        assert_eq!(merged.entry_path.as_deref(), Some("screens/Dashboard.tsx"));
        assert_eq!(merged.entry_component.as_deref(), Some("Dashboard"));
    }

    #[test]
    fn test_raw_fallback_used_when_no_files_qualify() {
        let s = ProjectSnapshot::new().with_fallback("function App() { return null; }");
        let merged = assemble(&s).unwrap();
        assert_eq!(merged.entry_path, None);
        assert_eq!(merged.entry_component.as_deref(), Some("App"));
    }

    #[test]
    fn test_empty_snapshot_is_caller_error() {
        let s = ProjectSnapshot::new();
        assert!(matches!(assemble(&s), Err(PreviewError::EmptySnapshot)));
    }

    #[test]
    fn test_infrastructure_files_excluded() {
        assert!(is_infrastructure_path("main.tsx"));
        assert!(is_infrastructure_path("src/main.tsx"));
        assert!(is_infrastructure_path("app/layout.tsx"));
        assert!(is_infrastructure_path("pages/_app.tsx"));
        assert!(is_infrastructure_path("pages/_document.tsx"));
        assert!(is_infrastructure_path("tailwind.config.js"));
        assert!(!is_infrastructure_path("components/Layout.tsx"));
        assert!(!is_infrastructure_path("App.tsx"));
    }

    #[test]
    fn test_style_and_config_files_are_not_candidates() {
        assert!(!is_component_candidate("styles.css", ".a { color: red; }"));
        assert!(!is_component_candidate("data.json", "{\"a\": 1}"));
        // Right extension but defines nothing.
        assert!(!is_component_candidate("empty.ts", "// just a comment\n"));
        assert!(is_component_candidate(
            "components/Nav.tsx",
            "export function Nav() {}"
        ));
    }

    #[test]
    fn test_detect_entry_component_forms() {
        assert_eq!(
            detect_entry_component("export default function App() {}").as_deref(),
            Some("App")
        );
        assert_eq!(
            detect_entry_component("function Home() {}\nexport default Home;").as_deref(),
            Some("Home")
        );
        assert_eq!(
            detect_entry_component("const Dashboard = () => null;").as_deref(),
            Some("Dashboard")
        );
        assert_eq!(detect_entry_component("const helper = 1;"), None);
    }
}

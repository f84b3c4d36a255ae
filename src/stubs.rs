//! Dependency Stub Synthesizer.
//!
//! Every identifier pulled in by a removed import is classified into exactly
//! one of four kinds, first match wins:
//!
//! 1. platform primitive - provided by the sandbox prelude, never stubbed
//! 2. icon - satisfied by the shared icon-rendering proxy
//! 3. library export - satisfied by the runtime shims in the document
//! 4. unknown - gets one synthesized stand-in
//!
//! Classification is a pure function of the tables and the name, stable
//! across runs. A name already declared in the erased source is never
//! stubbed: declared wins.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::eraser::{ImportKind, ImportRecord};

/// Kind of a free identifier left behind by import stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierClass {
    PlatformPrimitive,
    Icon,
    LibraryExport,
    Unknown,
}

/// Names the sandbox prelude destructures from the platform UI library.
const PLATFORM_PRIMITIVES: &[&str] = &[
    "React",
    "ReactDOM",
    "createRoot",
    "useState",
    "useEffect",
    "useMemo",
    "useCallback",
    "useRef",
    "useContext",
    "useReducer",
    "useLayoutEffect",
    "useId",
    "useTransition",
    "useDeferredValue",
    "useSyncExternalStore",
    "useImperativeHandle",
    "createContext",
    "createElement",
    "cloneElement",
    "isValidElement",
    "Children",
    "Fragment",
    "StrictMode",
    "Suspense",
    "forwardRef",
    "memo",
    "lazy",
    "startTransition",
    "Component",
    "PureComponent",
];

/// Icon names the shared proxy answers for. Names outside the embedded path
/// table still render the generic fallback glyph, so the table can stay a
/// classification surface rather than a completeness guarantee.
const ICON_NAMES: &[&str] = &[
    "Activity", "AlertCircle", "AlertTriangle", "Archive", "ArrowDown", "ArrowDownRight",
    "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowUpRight", "Award", "BarChart", "BarChart2",
    "BarChart3", "Battery", "Bell", "Bluetooth", "Bold", "Book", "BookOpen", "Bookmark", "Box",
    "Briefcase", "Calendar", "Camera", "Check", "CheckCircle", "CheckCircle2", "CheckSquare",
    "ChevronDown", "ChevronLeft", "ChevronRight", "ChevronUp", "Circle", "Clipboard", "Clock",
    "Cloud", "Code", "Coffee", "Compass", "Copy", "CreditCard", "Database", "Download", "Droplet",
    "Edit", "Edit2", "Edit3", "ExternalLink", "Eye", "EyeOff", "Facebook", "File", "FileText",
    "Film", "Filter", "Flag", "Folder", "Gift", "Github", "Globe", "Grid", "Hash", "Headphones",
    "Heart", "HelpCircle", "Home", "Image", "Inbox", "Info", "Instagram", "Key", "Layers",
    "Layout", "LifeBuoy", "Link2", "Linkedin", "List", "Loader", "Loader2", "Lock",
    "LogIn", "LogOut", "Mail", "Map", "MapPin", "Maximize", "Menu", "MessageCircle",
    "MessageSquare", "Mic", "Minimize", "Minus", "Monitor", "Moon", "MoreHorizontal",
    "MoreVertical", "MousePointer", "Move", "Music", "Navigation", "Package", "Paperclip",
    "Pause", "PenTool", "Percent", "Phone", "PieChart", "Play", "PlayCircle", "Plus",
    "PlusCircle", "Power", "Printer", "Radio", "RefreshCw", "Repeat", "Rocket", "RotateCw",
    "Rss", "Save", "Scissors", "Search", "Send", "Server", "Settings", "Share", "Share2",
    "Shield", "ShieldCheck", "ShoppingBag", "ShoppingCart", "Shuffle", "Sidebar", "Sliders",
    "Smartphone", "Sparkle", "Sparkles", "Speaker", "Square", "Star", "Sun", "Sunrise", "Sunset",
    "Tablet", "Tag", "Target", "Terminal", "ThumbsDown", "ThumbsUp", "Trash", "Trash2",
    "TrendingDown", "TrendingUp", "Triangle", "Truck", "Twitter", "Type", "Umbrella", "Unlock",
    "Upload", "User", "UserCheck", "UserMinus", "UserPlus", "Users", "Video", "Volume",
    "Volume2", "Wallet", "Watch", "Wifi", "Wind", "X", "XCircle", "Youtube", "Zap", "ZapOff",
    "ZoomIn", "ZoomOut",
];

/// Exports the runtime shims in the document provide: animation, routing,
/// forms, HTTP, sockets.
const LIBRARY_EXPORTS: &[&str] = &[
    // animation
    "motion",
    "m",
    "AnimatePresence",
    "LayoutGroup",
    "LazyMotion",
    "domAnimation",
    "Reorder",
    "useAnimation",
    "useAnimationControls",
    "useMotionValue",
    "useTransform",
    "useScroll",
    "useSpring",
    "useInView",
    "useDragControls",
    // routing
    "BrowserRouter",
    "HashRouter",
    "MemoryRouter",
    "Router",
    "Routes",
    "Route",
    "Link",
    "NavLink",
    "Navigate",
    "Outlet",
    "useNavigate",
    "useParams",
    "useLocation",
    "useSearchParams",
    // forms
    "useForm",
    "Controller",
    "FormProvider",
    "useFormContext",
    "useWatch",
    "useFieldArray",
    // HTTP / sockets
    "axios",
    "io",
];

lazy_static! {
    static ref DECLARATION_RE: Regex = Regex::new(
        r"(?m)^\s*(?:(?:async\s+)?function|class|const|let|var)\s+([A-Za-z_$][\w$]*)"
    )
    .unwrap();
}

/// Immutable classification tables, injected at Document-Builder
/// construction. `Default` carries the built-ins; hosts may extend before
/// handing the tables over.
#[derive(Debug, Clone)]
pub struct StubTables {
    pub platform: HashSet<String>,
    pub icons: HashSet<String>,
    pub library: HashSet<String>,
}

impl Default for StubTables {
    fn default() -> Self {
        Self {
            platform: PLATFORM_PRIMITIVES.iter().map(|s| s.to_string()).collect(),
            icons: ICON_NAMES.iter().map(|s| s.to_string()).collect(),
            library: LIBRARY_EXPORTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl StubTables {
    /// Classify one identifier. First match wins; everything else is
    /// explicitly `Unknown`, never an untyped fallthrough.
    pub fn classify(&self, name: &str) -> IdentifierClass {
        if self.platform.contains(name) {
            IdentifierClass::PlatformPrimitive
        } else if self.icons.contains(name) {
            IdentifierClass::Icon
        } else if self.library.contains(name) {
            IdentifierClass::LibraryExport
        } else {
            IdentifierClass::Unknown
        }
    }
}

/// The synthesized declaration block, additive to the erased source.
#[derive(Debug, Clone, Default)]
pub struct StubBlock {
    pub code: String,
    /// Unknown names that received a synthesized stand-in.
    pub stubbed: Vec<String>,
    /// Icon names bound to the shared proxy.
    pub icons_used: Vec<String>,
}

impl StubBlock {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Synthesize stand-ins for every import record the sandbox does not
/// otherwise satisfy.
pub fn synthesize_stubs(
    erased_source: &str,
    imports: &[ImportRecord],
    tables: &StubTables,
) -> StubBlock {
    let declared = declared_names(erased_source);
    let mut block = StubBlock::default();
    let mut bound: HashSet<&str> = HashSet::new();
    let mut lines: Vec<String> = Vec::new();

    for record in imports {
        let name = record.local_name.as_str();
        if declared.contains(name) || !bound.insert(name) {
            continue;
        }
        match tables.classify(name) {
            IdentifierClass::PlatformPrimitive | IdentifierClass::LibraryExport => {}
            IdentifierClass::Icon => {
                lines.push(format!(
                    "const {} = __previewIcon(\"{}\");",
                    name,
                    icon_slug(name)
                ));
                block.icons_used.push(name.to_string());
            }
            IdentifierClass::Unknown => {
                lines.push(render_unknown_stub(record));
                block.stubbed.push(name.to_string());
            }
        }
    }

    if !lines.is_empty() {
        debug!(
            stubs = block.stubbed.len(),
            icons = block.icons_used.len(),
            "synthesized import stand-ins"
        );
        block.code = format!("// Stand-ins for imports the sandbox does not provide.\n{}", lines.join("\n"));
    }
    block
}

/// Stand-in shape for an unknown name. Stubs use `React.createElement`
/// rather than JSX so they survive the aggressive second compile pass
/// untouched.
fn render_unknown_stub(record: &ImportRecord) -> String {
    let name = &record.local_name;
    if record.kind == ImportKind::Namespace {
        // Any member access yields a pass-through component.
        return format!(
            "const {} = new Proxy({{}}, {{ get: () => ({{ children, ...props }}) => React.createElement('div', props, children) }});",
            name
        );
    }
    if is_hook_name(name) {
        format!(
            "const {} = (initialValue) => {{ const [value, setValue] = React.useState(initialValue); return [value, setValue]; }};",
            name
        )
    } else {
        format!(
            "const {} = ({{ children, ...props }}) => React.createElement('div', props, children);",
            name
        )
    }
}

/// Hook-shaped: the reserved `use` prefix followed by a capital.
pub fn is_hook_name(name: &str) -> bool {
    name.strip_prefix("use")
        .and_then(|rest| rest.chars().next())
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

/// PascalCase icon name to its kebab-case table key: `ChevronDown` ->
/// `chevron-down`, `BarChart3` -> `bar-chart-3`.
pub fn icon_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if (c.is_ascii_uppercase() || c.is_ascii_digit()) && prev_lower {
            slug.push('-');
        }
        prev_lower = c.is_ascii_lowercase();
        slug.push(c.to_ascii_lowercase());
    }
    slug
}

/// Names declared in the erased source itself.
pub fn declared_names(source: &str) -> HashSet<String> {
    DECLARATION_RE
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .collect()
}

//! Sandbox Document Builder.
//!
//! Renders one self-contained executable HTML document from the processed
//! source: pinned external runtimes, the shared CSS block, the runtime shims
//! backing the library allow-list, the erased+stubbed source as inert text,
//! and the bootstrap compile/mount/report loop.
//!
//! ## Document invariants
//!
//! 1. The document never assumes network access beyond the pinned runtime
//!    scripts; every other dependency is a shim or a synthesized stub.
//! 2. The processed source is embedded inert (`text/plain`) so the two-stage
//!    compile owns the only execution path.
//! 3. Every failure inside the sandbox becomes a `preview-error` message to
//!    the host; a compile failure renders the inline diagnostic panel, never
//!    a blank frame.
//! 4. Configuration (icon table, allow-list, theme) is injected at
//!    construction; the builder holds no mutable global state.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::assembler::{assemble, COMMON_ROOT_NAMES};
use crate::eraser::{erase, DEFAULT_EXPORT_NAME};
use crate::error::PreviewError;
use crate::snapshot::{extension, PreviewInput, ProjectSnapshot, ThemeColors};
use crate::stubs::{synthesize_stubs, StubTables};

/// Pinned runtime versions, loaded live at sandbox start.
const REACT_URL: &str = "https://unpkg.com/react@18.3.1/umd/react.production.min.js";
const REACT_DOM_URL: &str = "https://unpkg.com/react-dom@18.3.1/umd/react-dom.production.min.js";
const BABEL_URL: &str = "https://unpkg.com/@babel/standalone@7.26.4/babel.min.js";
const TAILWIND_URL: &str = "https://cdn.tailwindcss.com";

lazy_static! {
    static ref TAILWIND_DIRECTIVE_RE: Regex =
        Regex::new(r"(?m)^\s*@tailwind\b[^\n]*\n?").unwrap();
    static ref APPLY_DIRECTIVE_RE: Regex =
        Regex::new(r"(?m)^\s*@apply\b[^;\n]*;?[ \t]*\n?").unwrap();
}

/// Builds sandbox documents. Tables and theme are fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    tables: StubTables,
    theme: ThemeColors,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: StubTables) -> Self {
        Self {
            tables,
            theme: ThemeColors::default(),
        }
    }

    pub fn theme(mut self, theme: ThemeColors) -> Self {
        self.theme = theme;
        self
    }

    /// Run the full pipeline over a snapshot and render the document.
    pub fn build(&self, snapshot: &ProjectSnapshot) -> Result<String, PreviewError> {
        let merged = assemble(snapshot)?;
        let erased = erase(&merged.source);
        let stubs = synthesize_stubs(&erased.source, &erased.imports, &self.tables);

        let mut program = String::new();
        if !stubs.is_empty() {
            program.push_str(&stubs.code);
            program.push_str("\n\n");
        }
        program.push_str(&erased.source);

        let resolver = root_resolver(
            erased.default_alias.as_deref(),
            merged.entry_component.as_deref(),
        );

        debug!(
            program_bytes = program.len(),
            stubs = stubs.stubbed.len(),
            "rendering sandbox document"
        );
        Ok(render_document(
            &program,
            &resolver,
            &self.theme,
            &collect_css(snapshot),
        ))
    }
}

/// Convenience entry point over [`PreviewInput`]: the shape hosts hand us.
pub fn build_preview_document(input: &PreviewInput) -> Result<String, PreviewError> {
    let snapshot = input.snapshot();
    let mut builder = DocumentBuilder::new();
    if let Some(theme) = &input.theme_colors {
        builder = builder.theme(theme.clone());
    }
    builder.build(&snapshot)
}

/// Root-resolution priority: the reserved default-export name, the detected
/// entry component, then the common fallbacks. Emitted as a JS epilogue that
/// returns the first bound candidate.
fn root_resolver(default_alias: Option<&str>, entry_component: Option<&str>) -> String {
    let mut candidates: Vec<&str> = vec![DEFAULT_EXPORT_NAME];
    if let Some(alias) = default_alias {
        candidates.push(alias);
    }
    if let Some(entry) = entry_component {
        candidates.push(entry);
    }
    candidates.extend_from_slice(COMMON_ROOT_NAMES);

    let mut seen = std::collections::HashSet::new();
    let mut lines = String::from("return (function () {\n");
    for name in candidates {
        if !seen.insert(name) {
            continue;
        }
        lines.push_str(&format!(
            "  if (typeof {name} !== 'undefined' && {name}) return {name};\n"
        ));
    }
    lines.push_str("  return null;\n})();");
    lines
}

/// Plain CSS files from the snapshot, build-tool-only directives stripped:
/// the utility framework loads live in the sandbox instead of pre-building.
fn collect_css(snapshot: &ProjectSnapshot) -> String {
    let mut out = String::new();
    for (path, content) in snapshot.files() {
        if extension(path).as_deref() != Some("css") {
            continue;
        }
        let stripped = TAILWIND_DIRECTIVE_RE.replace_all(content, "");
        let stripped = APPLY_DIRECTIVE_RE.replace_all(&stripped, "");
        let stripped = stripped.trim();
        if !stripped.is_empty() {
            out.push_str(stripped);
            out.push('\n');
        }
    }
    out
}

/// The processed source must stay inert inside its carrier tag.
fn escape_inline_source(source: &str) -> String {
    source.replace("</script", "<\\/script")
}

fn theme_css(theme: &ThemeColors) -> String {
    format!(
        ":root {{\n  --primary: {};\n  --secondary: {};\n  --accent: {};\n  --background: {};\n  --surface: {};\n  --text: {};\n}}",
        theme.primary.as_deref().unwrap_or("#6366f1"),
        theme.secondary.as_deref().unwrap_or("#8b5cf6"),
        theme.accent.as_deref().unwrap_or("#f59e0b"),
        theme.background.as_deref().unwrap_or("#ffffff"),
        theme.surface.as_deref().unwrap_or("#f8fafc"),
        theme.text.as_deref().unwrap_or("#0f172a"),
    )
}

fn render_document(
    program: &str,
    resolver: &str,
    theme: &ThemeColors,
    snapshot_css: &str,
) -> String {
    let resolver_literal =
        serde_json::to_string(resolver).unwrap_or_else(|_| "\"return null;\"".to_string());

    let mut doc = String::with_capacity(program.len() + 16 * 1024);
    doc.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    doc.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    doc.push_str(&format!(
        "<script crossorigin src=\"{REACT_URL}\"></script>\n<script crossorigin src=\"{REACT_DOM_URL}\"></script>\n<script src=\"{BABEL_URL}\"></script>\n<script src=\"{TAILWIND_URL}\"></script>\n"
    ));
    doc.push_str(TAILWIND_CONFIG);
    doc.push_str("<style>\n");
    doc.push_str(&theme_css(theme));
    doc.push('\n');
    doc.push_str(SHARED_CSS);
    if !snapshot_css.is_empty() {
        doc.push('\n');
        doc.push_str(snapshot_css);
    }
    doc.push_str("</style>\n</head>\n<body>\n<div id=\"root\"></div>\n");

    doc.push_str("<script type=\"text/plain\" id=\"preview-source\">\n");
    doc.push_str(&escape_inline_source(program));
    doc.push_str("\n</script>\n");

    doc.push_str("<script>\n");
    doc.push_str(SHIM_RUNTIME);
    doc.push_str("</script>\n<script>\n");
    doc.push_str(&BOOTSTRAP_JS.replace("\"__RESOLVER_PLACEHOLDER__\"", &resolver_literal));
    doc.push_str("</script>\n</body>\n</html>\n");
    doc
}

const TAILWIND_CONFIG: &str = r##"<script>
tailwind.config = {
  theme: {
    extend: {
      colors: {
        primary: 'var(--primary)',
        secondary: 'var(--secondary)',
        accent: 'var(--accent)',
        background: 'var(--background)',
        surface: 'var(--surface)'
      }
    }
  }
};
</script>
"##;

const SHARED_CSS: &str = r##"* { box-sizing: border-box; }
html, body, #root { min-height: 100%; }
body {
  margin: 0;
  background: var(--background);
  color: var(--text);
  font-family: ui-sans-serif, system-ui, -apple-system, 'Segoe UI', Roboto, sans-serif;
}
@keyframes preview-spin { to { transform: rotate(360deg); } }
@keyframes preview-pulse { 50% { opacity: 0.5; } }
@keyframes preview-fade-in {
  from { opacity: 0; transform: translateY(4px); }
  to { opacity: 1; transform: none; }
}
.animate-spin { animation: preview-spin 1s linear infinite; }
.animate-pulse { animation: preview-pulse 2s cubic-bezier(0.4, 0, 0.6, 1) infinite; }
.animate-fade-in { animation: preview-fade-in 0.3s ease-out; }
::-webkit-scrollbar { width: 8px; height: 8px; }
::-webkit-scrollbar-thumb { background: rgba(100, 116, 139, 0.5); border-radius: 4px; }
.preview-diagnostic {
  margin: 16px;
  padding: 16px;
  border: 1px solid #fca5a5;
  border-radius: 8px;
  background: #fef2f2;
  color: #991b1b;
  font-family: ui-monospace, SFMono-Regular, Menlo, monospace;
}
.preview-diagnostic h2 { margin: 0 0 8px; font-size: 14px; }
.preview-diagnostic pre { margin: 0; white-space: pre-wrap; font-size: 12px; }
"##;

/// Runtime shims: the platform prelude plus the library allow-list surface.
/// Top-level `const` bindings in a classic script are visible to the
/// `new Function` body the compiled program runs in.
const SHIM_RUNTIME: &str = r##"'use strict';
const { useState, useEffect, useMemo, useCallback, useRef, useContext, useReducer,
  useLayoutEffect, useId, useTransition, useDeferredValue, useSyncExternalStore,
  useImperativeHandle, createContext, createElement, cloneElement, isValidElement,
  Children, Fragment, StrictMode, Suspense, forwardRef, memo, lazy, startTransition,
  Component, PureComponent } = React;
const { createRoot } = ReactDOM;

function __postMessage(message) {
  try { window.parent.postMessage(message, '*'); } catch (_) {}
}

/* Icon proxy: keyed by name, built-in path table, generic fallback glyph. */
const __PREVIEW_ICON_PATHS = {
  'check': 'M20 6 9 17l-5-5',
  'x': 'M18 6 6 18M6 6l12 12',
  'plus': 'M12 5v14M5 12h14',
  'minus': 'M5 12h14',
  'menu': 'M4 6h16M4 12h16M4 18h16',
  'chevron-down': 'm6 9 6 6 6-6',
  'chevron-up': 'm18 15-6-6-6 6',
  'chevron-left': 'm15 18-6-6 6-6',
  'chevron-right': 'm9 18 6-6-6-6',
  'arrow-right': 'M5 12h14M12 5l7 7-7 7',
  'arrow-left': 'M19 12H5M12 19l-7-7 7-7',
  'search': 'M21 21l-4.3-4.3M11 19a8 8 0 1 0 0-16 8 8 0 0 0 0 16z',
  'sun': 'M12 17a5 5 0 1 0 0-10 5 5 0 0 0 0 10zM12 1v2M12 21v2M4.22 4.22l1.42 1.42M18.36 18.36l1.42 1.42M1 12h2M21 12h2M4.22 19.78l1.42-1.42M18.36 5.64l1.42-1.42',
  'moon': 'M21 12.8A9 9 0 1 1 11.2 3 7 7 0 0 0 21 12.8z',
  'star': 'm12 2 3.1 6.3 6.9 1-5 4.9 1.2 6.8L12 17.8 5.8 21l1.2-6.8-5-4.9 6.9-1L12 2z',
  'heart': 'M19 14c1.5-1.5 3-3.2 3-5.5A5.5 5.5 0 0 0 16.5 3c-1.8 0-3 .5-4.5 2-1.5-1.5-2.7-2-4.5-2A5.5 5.5 0 0 0 2 8.5c0 2.3 1.5 4 3 5.5l7 7z',
  'user': 'M19 21v-2a4 4 0 0 0-4-4H9a4 4 0 0 0-4 4v2M12 11a4 4 0 1 0 0-8 4 4 0 0 0 0 8z',
  'mail': 'M4 4h16a2 2 0 0 1 2 2v12a2 2 0 0 1-2 2H4a2 2 0 0 1-2-2V6a2 2 0 0 1 2-2zM22 6l-10 7L2 6',
  'home': 'M3 9.5 12 3l9 6.5V21a1 1 0 0 1-1 1h-5v-7h-6v7H4a1 1 0 0 1-1-1V9.5z',
  'zap': 'M13 2 3 14h8l-1 8 11-12h-8l1-8z',
  'trash-2': 'M3 6h18M8 6V4a1 1 0 0 1 1-1h6a1 1 0 0 1 1 1v2M19 6l-1 14a2 2 0 0 1-2 2H8a2 2 0 0 1-2-2L5 6M10 11v6M14 11v6',
  'calendar': 'M8 2v4M16 2v4M3 8h18M5 4h14a2 2 0 0 1 2 2v14a2 2 0 0 1-2 2H5a2 2 0 0 1-2-2V6a2 2 0 0 1 2-2z',
  'clock': 'M12 22a10 10 0 1 0 0-20 10 10 0 0 0 0 20zM12 6v6l4 2',
  'settings': 'M12 15a3 3 0 1 0 0-6 3 3 0 0 0 0 6zM19.4 15a1.65 1.65 0 0 0 .33 1.82l.06.06a2 2 0 1 1-2.83 2.83l-.06-.06a1.65 1.65 0 0 0-1.82-.33 1.65 1.65 0 0 0-1 1.51V21a2 2 0 1 1-4 0v-.09a1.65 1.65 0 0 0-1-1.51 1.65 1.65 0 0 0-1.82.33l-.06.06a2 2 0 1 1-2.83-2.83l.06-.06a1.65 1.65 0 0 0 .33-1.82 1.65 1.65 0 0 0-1.51-1H3a2 2 0 1 1 0-4h.09a1.65 1.65 0 0 0 1.51-1 1.65 1.65 0 0 0-.33-1.82l-.06-.06a2 2 0 1 1 2.83-2.83l.06.06a1.65 1.65 0 0 0 1.82.33 1.65 1.65 0 0 0 1-1.51V3a2 2 0 1 1 4 0v.09a1.65 1.65 0 0 0 1 1.51 1.65 1.65 0 0 0 1.82-.33l.06-.06a2 2 0 1 1 2.83 2.83l-.06.06a1.65 1.65 0 0 0-.33 1.82 1.65 1.65 0 0 0 1.51 1H21a2 2 0 1 1 0 4h-.09a1.65 1.65 0 0 0-1.51 1z'
};
function __previewIcon(name) {
  function PreviewIcon(props) {
    props = props || {};
    var size = props.size || 24;
    var d = __PREVIEW_ICON_PATHS[name];
    var shape = d
      ? React.createElement('path', { d: d })
      : React.createElement('circle', { cx: 12, cy: 12, r: 9 });
    return React.createElement('svg', {
      width: size, height: size, viewBox: '0 0 24 24', fill: 'none',
      stroke: 'currentColor', strokeWidth: props.strokeWidth || 2,
      strokeLinecap: 'round', strokeLinejoin: 'round',
      className: props.className, style: props.style, 'aria-hidden': true
    }, shape);
  }
  PreviewIcon.displayName = 'Icon(' + name + ')';
  return PreviewIcon;
}

/* Animation shim: forward animation-only props away, render the element. */
var __MOTION_PROPS = ['initial', 'animate', 'exit', 'transition', 'variants',
  'whileHover', 'whileTap', 'whileFocus', 'whileDrag', 'whileInView', 'viewport',
  'layout', 'layoutId', 'drag', 'dragConstraints', 'dragElastic', 'dragMomentum',
  'onAnimationStart', 'onAnimationComplete', 'onDragStart', 'onDragEnd',
  'onViewportEnter', 'onViewportLeave'];
function __stripMotionProps(props) {
  var clean = {};
  for (var key in props) {
    if (__MOTION_PROPS.indexOf(key) === -1) clean[key] = props[key];
  }
  return clean;
}
const motion = new Proxy({}, {
  get: function (_target, tag) {
    return function MotionShim(props) {
      return React.createElement(
        typeof tag === 'string' ? tag : 'div',
        __stripMotionProps(props || {})
      );
    };
  }
});
const m = motion;
const AnimatePresence = function (props) {
  return React.createElement(React.Fragment, null, props && props.children);
};
const LayoutGroup = AnimatePresence;
const LazyMotion = AnimatePresence;
const domAnimation = {};
const Reorder = {
  Group: function (props) { return React.createElement('div', __stripMotionProps(props || {})); },
  Item: function (props) { return React.createElement('div', __stripMotionProps(props || {})); }
};
const useAnimation = function () {
  return {
    start: function () { return Promise.resolve(); },
    stop: function () {},
    set: function () {}
  };
};
const useAnimationControls = useAnimation;
const useMotionValue = function (initial) {
  return {
    get: function () { return initial; },
    set: function () {},
    on: function () { return function () {}; }
  };
};
const useTransform = function () { return useMotionValue(0); };
const useSpring = function (value) {
  return (value && typeof value === 'object') ? value : useMotionValue(value);
};
const useScroll = function () {
  return {
    scrollX: useMotionValue(0), scrollY: useMotionValue(0),
    scrollXProgress: useMotionValue(0), scrollYProgress: useMotionValue(0)
  };
};
const useInView = function () { return true; };
const useDragControls = function () { return { start: function () {} }; };

/* Routing shim: location-fragment tracking, no real navigation. */
var __routerState = {
  path: (location.hash || '#/').slice(1) || '/',
  listeners: []
};
function __notifyRouter(path) {
  for (var i = 0; i < __routerState.listeners.length; i++) {
    __routerState.listeners[i](path);
  }
}
function __setPath(path) {
  if (path === __routerState.path) return;
  __routerState.path = path;
  try { history.replaceState(null, '', '#' + path); } catch (_) {}
  __notifyRouter(path);
  __postMessage({ type: 'preview-navigation', path: path });
}
window.addEventListener('hashchange', function () {
  var next = (location.hash || '#/').slice(1) || '/';
  if (next !== __routerState.path) {
    __routerState.path = next;
    __notifyRouter(next);
  }
});
function __usePath() {
  var pair = React.useState(__routerState.path);
  React.useEffect(function () {
    __routerState.listeners.push(pair[1]);
    return function () {
      var at = __routerState.listeners.indexOf(pair[1]);
      if (at !== -1) __routerState.listeners.splice(at, 1);
    };
  }, []);
  return pair[0];
}
var __RouteParamsContext = React.createContext({});
function __matchRoute(pattern, path) {
  if (pattern == null) return null;
  if (pattern === '*') return {};
  var want = pattern.split('/').filter(Boolean);
  var have = path.split('/').filter(Boolean);
  var params = {};
  for (var i = 0; i < want.length; i++) {
    if (want[i] === '*') return params;
    if (want[i].charAt(0) === ':') {
      if (i >= have.length) return null;
      params[want[i].slice(1)] = have[i];
      continue;
    }
    if (want[i] !== have[i]) return null;
  }
  return want.length === have.length ? params : null;
}
const BrowserRouter = function (props) {
  return React.createElement(React.Fragment, null, props && props.children);
};
const HashRouter = BrowserRouter;
const MemoryRouter = BrowserRouter;
const Router = BrowserRouter;
const Route = function () { return null; };
const Routes = function (props) {
  var path = __usePath();
  var children = React.Children.toArray(props && props.children);
  for (var i = 0; i < children.length; i++) {
    var route = children[i];
    if (!route || !route.props) continue;
    var params = __matchRoute(route.props.path, path);
    if (params) {
      return React.createElement(
        __RouteParamsContext.Provider,
        { value: params },
        route.props.element || null
      );
    }
  }
  return null;
};
const Navigate = function (props) {
  React.useEffect(function () {
    if (props && props.to) __setPath(props.to);
  }, []);
  return null;
};
const Outlet = function () { return null; };
const Link = function (props) {
  props = props || {};
  var to = props.to || '/';
  var rest = {};
  for (var key in props) {
    if (key !== 'to' && key !== 'children') rest[key] = props[key];
  }
  rest.href = '#' + to;
  rest.onClick = function (event) {
    event.preventDefault();
    __setPath(to);
    if (props.onClick) props.onClick(event);
  };
  return React.createElement('a', rest, props.children);
};
const NavLink = Link;
const useNavigate = function () {
  return function (to) { __setPath(typeof to === 'string' ? to : '/'); };
};
const useParams = function () { return React.useContext(__RouteParamsContext); };
const useLocation = function () {
  var path = __usePath();
  return { pathname: path, search: '', hash: '', state: null };
};
const useSearchParams = function () {
  return [new URLSearchParams(''), function () {}];
};

/* Forms shim. */
const useForm = function () {
  var valuesRef = React.useRef({});
  return {
    register: function (name) {
      return {
        name: name,
        onChange: function (event) {
          valuesRef.current[name] = event && event.target ? event.target.value : event;
        }
      };
    },
    handleSubmit: function (onValid) {
      return function (event) {
        if (event && event.preventDefault) event.preventDefault();
        if (onValid) onValid(valuesRef.current);
      };
    },
    watch: function (name) {
      return name ? valuesRef.current[name] : valuesRef.current;
    },
    setValue: function (name, value) { valuesRef.current[name] = value; },
    getValues: function () { return valuesRef.current; },
    reset: function () { valuesRef.current = {}; },
    formState: { errors: {}, isSubmitting: false }
  };
};
const Controller = function (props) {
  if (props && props.render) {
    return props.render({ field: { value: undefined, onChange: function () {} } });
  }
  return null;
};
const FormProvider = function (props) {
  return React.createElement(React.Fragment, null, props && props.children);
};
const useFormContext = function () { return useForm(); };
const useWatch = function () { return undefined; };
const useFieldArray = function () {
  return { fields: [], append: function () {}, remove: function () {} };
};

/* Inert HTTP / socket stand-ins: resolve immediately with empty data. */
function __inertResponse() {
  return Promise.resolve({ data: null, status: 200, statusText: 'OK', headers: {} });
}
const axios = {
  get: __inertResponse, post: __inertResponse, put: __inertResponse,
  patch: __inertResponse, delete: __inertResponse, head: __inertResponse,
  request: __inertResponse,
  create: function () { return axios; },
  defaults: { headers: {} },
  interceptors: {
    request: { use: function () {} },
    response: { use: function () {} }
  }
};
const io = function () {
  var socket = {
    connected: false,
    on: function () { return socket; },
    off: function () { return socket; },
    once: function () { return socket; },
    emit: function () { return socket; },
    connect: function () { return socket; },
    disconnect: function () { return socket; }
  };
  return socket;
};
"##;

/// The compile/mount/report loop. States: Idle -> Compiling -> {Mounted |
/// CompileFailed | MountFailed | RuntimeFaulted}. The resolver literal is
/// substituted in at render time.
const BOOTSTRAP_JS: &str = r##"(function () {
  'use strict';
  var container = document.getElementById('root');
  var __ROOT_RESOLVER = "__RESOLVER_PLACEHOLDER__";

  function escapeHtml(text) {
    return String(text).replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
  }

  function reportError(message, source, extra) {
    var error = {
      message: String(message == null ? 'Unknown error' : message),
      source: source
    };
    if (extra) {
      if (extra.line != null) error.line = extra.line;
      if (extra.column != null) error.column = extra.column;
      if (extra.stack != null) error.stack = String(extra.stack);
    }
    __postMessage({ type: 'preview-error', error: error });
  }

  function showDiagnostic(title, detail) {
    container.innerHTML =
      '<div class="preview-diagnostic"><h2>' + escapeHtml(title) + '</h2><pre>' +
      escapeHtml(detail || '') + '</pre></div>';
  }

  // Second-pass hardening: the same rule class as the host-side eraser,
  // widened. Only runs when the strict compile fails.
  function aggressiveStrip(src) {
    return src
      .replace(/^\s*import[^\n]*$/gm, '')
      .replace(/^\s*export\s+default\s+/gm, 'const __DEFAULT_EXPORT__ = ')
      .replace(/^\s*export\s+/gm, '')
      .replace(/\s+as\s+const\b/g, '')
      .replace(/\s+as\s+[A-Za-z_$][\w$.<>\[\], |&]*/g, '')
      .replace(/\s+satisfies\s+[A-Za-z_$][\w$.<>\[\], |&]*/g, '')
      .replace(/:\s*[A-Za-z_$][\w$.]*(<[^<>]*>)?(\[\])*\s*([,)=])/g, '$3')
      .replace(/([A-Za-z_$][\w$]*)<[^<>;\n]*>\(/g, '$1(');
  }

  function compile(src) {
    return Babel.transform(src, {
      presets: [['react', { runtime: 'classic' }]],
      filename: 'preview.jsx'
    }).code;
  }

  var sourceNode = document.getElementById('preview-source');
  var source = sourceNode ? sourceNode.textContent : '';
  var compiled = null;

  try {
    compiled = compile(source);
  } catch (firstError) {
    try {
      compiled = compile(aggressiveStrip(source));
    } catch (secondError) {
      var loc = secondError && secondError.loc;
      showDiagnostic('Compile error', String((secondError && secondError.message) || secondError));
      reportError((secondError && secondError.message) || secondError, 'compile', {
        line: loc && loc.line,
        column: loc && loc.column,
        stack: secondError && secondError.stack
      });
    }
  }

  if (compiled !== null) {
    try {
      var factory = new Function(compiled + '\n;' + __ROOT_RESOLVER);
      var Root = factory();
      if (Root == null) {
        // A successful mount of the diagnostic placeholder, not a failure.
        container.innerHTML =
          '<div class="preview-diagnostic"><h2>No root component</h2>' +
          '<pre>The code compiled but no mountable component was found.</pre></div>';
      } else {
        createRoot(container).render(React.createElement(Root));
      }
    } catch (mountError) {
      showDiagnostic('Mount error', String((mountError && mountError.message) || mountError));
      reportError((mountError && mountError.message) || mountError, 'mount', {
        stack: mountError && mountError.stack
      });
    }
  }

  // Persistent fault watchers: the sandbox keeps running after a fault.
  window.addEventListener('error', function (event) {
    reportError(event.message || 'Uncaught error', 'runtime', {
      line: event.lineno,
      column: event.colno,
      stack: event.error && event.error.stack
    });
  });
  window.addEventListener('unhandledrejection', function (event) {
    var reason = event.reason;
    reportError((reason && reason.message) || String(reason), 'runtime', {
      stack: reason && reason.stack
    });
  });
})();
"##;

#[cfg(feature = "napi")]
use napi_derive::napi;

#[cfg(feature = "napi")]
#[napi]
pub fn build_preview_document_native(input: serde_json::Value) -> napi::Result<String> {
    let input: PreviewInput = serde_json::from_value(input)
        .map_err(|e| napi::Error::from_reason(format!("Invalid preview input: {}", e)))?;
    build_preview_document(&input).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ProjectSnapshot;

    fn snapshot_of(files: &[(&str, &str)]) -> ProjectSnapshot {
        let mut s = ProjectSnapshot::new();
        for (path, content) in files {
            s.insert(*path, *content);
        }
        s
    }

    #[test]
    fn test_document_embeds_pinned_runtimes() {
        let s = snapshot_of(&[("App.tsx", "export default function App() { return null; }")]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains(REACT_URL));
        assert!(doc.contains(REACT_DOM_URL));
        assert!(doc.contains(BABEL_URL));
        assert!(doc.contains(TAILWIND_URL));
    }

    #[test]
    fn test_source_embedded_inert_and_escaped() {
        let s = snapshot_of(&[(
            "App.tsx",
            "export default function App() { return <div>{'</script>'}</div>; }",
        )]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains("<script type=\"text/plain\" id=\"preview-source\">"));
        assert!(doc.contains("<\\/script"));
    }

    #[test]
    fn test_theme_overrides_reflected() {
        let s = snapshot_of(&[("App.tsx", "export default function App() { return null; }")]);
        let theme = ThemeColors {
            primary: Some("#ff0000".to_string()),
            ..Default::default()
        };
        let doc = DocumentBuilder::new().theme(theme).build(&s).unwrap();
        assert!(doc.contains("--primary: #ff0000;"));
        assert!(doc.contains("--secondary: #8b5cf6;"));
    }

    #[test]
    fn test_stub_block_precedes_erased_source() {
        let s = snapshot_of(&[(
            "App.tsx",
            "import { FancyWidget } from 'fancy';\nexport default function App() { return <FancyWidget/>; }",
        )]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        let stub_at = doc.find("const FancyWidget =").unwrap();
        let app_at = doc.find("function App()").unwrap();
        assert!(stub_at < app_at);
    }

    #[test]
    fn test_root_resolver_priority_order() {
        let resolver = root_resolver(Some("Dashboard"), Some("Dashboard"));
        let default_at = resolver.find(DEFAULT_EXPORT_NAME).unwrap();
        let dashboard_at = resolver.find("Dashboard").unwrap();
        let app_at = resolver.find("typeof App").unwrap();
        assert!(default_at < dashboard_at);
        assert!(dashboard_at < app_at);
        // Deduplicated: alias and entry were the same name.
        assert_eq!(resolver.matches("typeof Dashboard").count(), 1);
    }

    #[test]
    fn test_snapshot_css_included_with_directives_stripped() {
        let s = snapshot_of(&[
            ("App.tsx", "export default function App() { return null; }"),
            (
                "globals.css",
                "@tailwind base;\n@tailwind components;\n.card {\n  @apply rounded shadow;\n  border: 1px solid black;\n}\n",
            ),
        ]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(!doc.contains("@tailwind"));
        assert!(!doc.contains("@apply"));
        assert!(doc.contains("border: 1px solid black;"));
    }

    #[test]
    fn test_bootstrap_reports_all_failure_kinds() {
        let s = snapshot_of(&[("App.tsx", "export default function App() { return null; }")]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains("'compile'"));
        assert!(doc.contains("'mount'"));
        assert!(doc.contains("'runtime'"));
        assert!(doc.contains("preview-error"));
        assert!(doc.contains("unhandledrejection"));
    }

    #[test]
    fn test_shims_cover_library_allow_list_surface() {
        let s = snapshot_of(&[("App.tsx", "export default function App() { return null; }")]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        for name in [
            "const motion",
            "const AnimatePresence",
            "const Routes",
            "const Link",
            "const axios",
            "const io",
            "const useForm",
        ] {
            assert!(doc.contains(name), "missing shim: {}", name);
        }
    }

    #[test]
    fn test_build_from_preview_input_code_only() {
        let input = PreviewInput {
            code: "export default function App() { return <h1>hi</h1>; }".to_string(),
            all_files: None,
            theme_colors: None,
        };
        let doc = build_preview_document(&input).unwrap();
        assert!(doc.contains("function App()"));
    }

    #[test]
    fn test_empty_input_is_error() {
        let input = PreviewInput::default();
        assert!(matches!(
            build_preview_document(&input),
            Err(PreviewError::EmptySnapshot)
        ));
    }
}

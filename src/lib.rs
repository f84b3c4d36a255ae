//! # Preview Sandbox Pipeline
//!
//! Turns an AI-generated multi-file UI project into one self-contained
//! executable document that compiles and mounts the program inside an
//! isolated sandbox, reporting every failure back to the host.
//!
//! ## Pipeline Invariants
//!
//! 1. **Stage order**: Assembler -> Eraser -> Stub Synthesizer -> Document
//!    Builder. Each stage consumes exactly the previous stage's output.
//! 2. **Determinism**: the same snapshot always yields the same entry file,
//!    the same merged source, and the same document. Entry ties break by
//!    candidate-list order, never by path sort order.
//! 3. **Best effort, never throw**: stages 1-4 are pure synchronous text
//!    processing. A non-matching rewrite rule is a no-op; residue is the
//!    sandbox compiler's problem and comes back as a structured message.
//! 4. **Declared wins**: a name both imported and declared locally is never
//!    stubbed.
//! 5. **No hidden globals**: icon table, library allow-list and theme are
//!    immutable configuration injected at Document-Builder construction.
//!
//! Failure reporting from inside the sandbox uses one shape for every
//! category: `{type: "preview-error", error: {message, source?, line?,
//! column?, stack?}}`.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod assembler;
mod document;
mod eraser;
mod error;
mod file_tree;
mod fingerprint;
mod snapshot;
mod stubs;

#[cfg(test)]
mod pipeline_tests;

pub use assembler::{
    assemble, detect_entry_component, is_component_candidate, MergedProgram, COMMON_ROOT_NAMES,
    ENTRY_CANDIDATES,
};
pub use document::{build_preview_document, DocumentBuilder};
pub use eraser::{erase, ErasedSource, ImportKind, ImportRecord, DEFAULT_EXPORT_NAME};
pub use error::{
    parse_preview_message, PreviewError, PreviewErrorDetail, PreviewMessage, FAULT_SOURCE_COMPILE,
    FAULT_SOURCE_MOUNT, FAULT_SOURCE_RUNTIME,
};
pub use file_tree::{build_file_tree, FileTreeNode, NodeKind};
pub use fingerprint::document_fingerprint;
pub use snapshot::{PreviewInput, ProjectSnapshot, SourceFile, ThemeColors};
pub use stubs::{synthesize_stubs, IdentifierClass, StubBlock, StubTables};

// Host-facing N-API surface, mirrored from the module-level exports.
#[cfg(feature = "napi")]
pub use document::build_preview_document_native;
#[cfg(feature = "napi")]
pub use file_tree::file_tree_native;
#[cfg(feature = "napi")]
pub use fingerprint::document_fingerprint_native;

#[cfg(feature = "napi")]
#[napi]
pub fn preview_bridge() -> String {
    "Preview Native Bridge Connected".to_string()
}

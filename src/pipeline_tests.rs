//! Cross-stage property tests for the preview pipeline.
//!
//! These pin the externally observable contract: deterministic assembly,
//! idempotent erasure, the no-undefined-reference guarantee, and the shape
//! of the emitted sandbox document.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::assembler::assemble;
    use crate::document::DocumentBuilder;
    use crate::eraser::erase;
    use crate::snapshot::ProjectSnapshot;
    use crate::stubs::{synthesize_stubs, IdentifierClass, StubTables};

    fn snapshot_of(files: &[(&str, &str)]) -> ProjectSnapshot {
        let mut s = ProjectSnapshot::new();
        for (path, content) in files {
            s.insert(*path, *content);
        }
        s
    }

    #[test]
    fn test_same_snapshot_same_document() {
        let s = snapshot_of(&[
            ("components/Header.tsx", "export function Header() { return <header/>; }"),
            ("App.tsx", "export default function App() { return <Header/>; }"),
        ]);
        let first = DocumentBuilder::new().build(&s).unwrap();
        let second = DocumentBuilder::new().build(&s).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_two_file_merge_orders_helper_before_entry() {
        // File A defines Header; entry B renders it. The merged program must
        // order Header above App and resolve App as the root.
        let s = snapshot_of(&[
            (
                "components/Header.tsx",
                "export function Header() { return <header>Site</header>; }",
            ),
            (
                "App.tsx",
                "export default function App() { return <Header/>; }",
            ),
        ]);
        let merged = assemble(&s).unwrap();
        let header_at = merged.source.find("function Header").unwrap();
        let app_at = merged.source.find("function App").unwrap();
        assert!(header_at < app_at);
        assert_eq!(merged.entry_component.as_deref(), Some("App"));

        // After erasure nothing module-shaped or type-shaped survives.
        let erased = erase(&merged.source);
        assert!(!erased.source.contains("import "));
        assert!(!erased.source.contains("export "));
        assert_eq!(erased.default_alias.as_deref(), Some("App"));

        // The document resolves App ahead of the generic fallbacks.
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains("typeof App"));
    }

    #[test]
    fn test_no_undefined_reference_after_stubbing() {
        // Every name pulled from an import ends up either provided by the
        // sandbox (platform/icon/library) or declared by the stub block.
        let s = snapshot_of(&[(
            "App.tsx",
            concat!(
                "import { useState } from 'react';\n",
                "import { Sun } from 'lucide-react';\n",
                "import { motion } from 'framer-motion';\n",
                "import { FancyWidget } from 'fancy-widgets';\n",
                "import { useCart } from 'cart-kit';\n",
                "export default function App() {\n",
                "  const [open, setOpen] = useState(false);\n",
                "  const [cart] = useCart([]);\n",
                "  return <motion.div><Sun/><FancyWidget/>{cart}</motion.div>;\n",
                "}\n",
            ),
        )]);

        let merged = assemble(&s).unwrap();
        let erased = erase(&merged.source);
        let tables = StubTables::default();
        let stubs = synthesize_stubs(&erased.source, &erased.imports, &tables);
        let program = format!("{}\n{}", stubs.code, erased.source);

        for record in &erased.imports {
            let name = record.local_name.as_str();
            let provided = matches!(
                tables.classify(name),
                IdentifierClass::PlatformPrimitive | IdentifierClass::LibraryExport
            );
            let declared = program.contains(&format!("const {} =", name))
                || program.contains(&format!("function {}", name));
            assert!(
                provided || declared,
                "{} is neither provided nor declared",
                name
            );
        }
    }

    #[test]
    fn test_declared_wins_end_to_end() {
        let s = snapshot_of(&[(
            "App.tsx",
            concat!(
                "import { Header } from './components/Header';\n",
                "function Header() { return <header/>; }\n",
                "export default function App() { return <Header/>; }\n",
            ),
        )]);
        let merged = assemble(&s).unwrap();
        let erased = erase(&merged.source);
        let stubs = synthesize_stubs(&erased.source, &erased.imports, &StubTables::default());
        assert!(stubs.is_empty(), "declared name must never be stubbed");
    }

    #[test]
    fn test_unknown_import_mounts_as_pass_through() {
        let s = snapshot_of(&[(
            "App.tsx",
            "import { MagicChart } from 'magic-charts';\nexport default function App() { return <MagicChart data={[1]}/>; }",
        )]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains(
            "const MagicChart = ({ children, ...props }) => React.createElement('div', props, children);"
        ));
    }

    #[test]
    fn test_stray_type_assertion_erased_in_first_pass() {
        let s = snapshot_of(&[(
            "App.tsx",
            "export default function App() { const el = window.document.body as HTMLElement; return <div/>; }",
        )]);
        let merged = assemble(&s).unwrap();
        let erased = erase(&merged.source);
        assert!(
            !erased.source.contains(" as "),
            "first-pass erasure must not leave the assertion to the in-sandbox retry"
        );
    }

    #[test]
    fn test_erasure_idempotent_over_full_pipeline_output() {
        let s = snapshot_of(&[
            ("components/Card.tsx", "export function Card({ title }: { title: string }) { return <div>{title}</div>; }"),
            ("App.tsx", "import { Card } from './components/Card';\nexport default function App() { return <Card title=\"hi\"/>; }"),
        ]);
        let merged = assemble(&s).unwrap();
        let once = erase(&merged.source);
        let twice = erase(&once.source);
        assert_eq!(once.source, twice.source);
        assert!(twice.imports.is_empty());
    }

    #[test]
    fn test_fallback_string_renders_without_files() {
        let s = ProjectSnapshot::new()
            .with_fallback("function App() { return <h1>Fallback</h1>; }");
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains("function App()"));
        assert!(doc.contains("typeof App"));
    }

    #[test]
    fn test_runtime_fault_watchers_are_persistent() {
        // Structural check on the emitted bootstrap: fault listeners are
        // registered on window and report without tearing anything down.
        let s = snapshot_of(&[("App.tsx", "export default function App() { return null; }")]);
        let doc = DocumentBuilder::new().build(&s).unwrap();
        assert!(doc.contains("window.addEventListener('error'"));
        assert!(doc.contains("window.addEventListener('unhandledrejection'"));
        // One report path for every fault kind.
        assert_eq!(doc.matches("reportError(").count(), 5);
    }
}

//! Property: the fileset enumerator's extension filter and the parser
//! module's `is_supported` must agree on every extension, in both
//! directions — a file `enumerate()` yields must be one `parse_file` would
//! at least attempt, and every extension `is_supported` accepts must
//! actually show up in an enumeration.

use folder_mcp::{fingerprint, parsers};
use tempfile::TempDir;

const SUPPORTED: &[&str] = &["txt", "md", "html", "htm", "pdf", "docx", "xlsx", "csv", "pptx"];
const UNSUPPORTED: &[&str] = &["png", "exe", "zip", "rs", "lock", ""];

#[test]
fn enumerate_agrees_with_is_supported_for_every_known_extension() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    for ext in SUPPORTED {
        std::fs::write(root.join(format!("doc.{ext}")), b"placeholder").unwrap();
        assert!(parsers::is_supported(ext), "is_supported should accept '{ext}'");
    }
    for ext in UNSUPPORTED {
        let name = if ext.is_empty() { "Makefile".to_string() } else { format!("file.{ext}") };
        std::fs::write(root.join(&name), b"placeholder").unwrap();
        assert!(!parsers::is_supported(ext), "is_supported should reject '{ext}'");
    }

    let found = fingerprint::enumerate(root).unwrap();
    let found_exts: std::collections::HashSet<String> = found
        .iter()
        .filter_map(|f| std::path::Path::new(&f.relative_path).extension())
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .collect();

    assert_eq!(found.len(), SUPPORTED.len(), "enumerate() must yield exactly the supported files");
    for ext in SUPPORTED {
        assert!(found_exts.contains(*ext), "enumerate() dropped a supported extension: {ext}");
    }
}

#[test]
fn is_supported_is_case_and_dot_insensitive_like_enumerate() {
    for ext in SUPPORTED {
        let upper = ext.to_ascii_uppercase();
        assert!(parsers::is_supported(&upper));
        assert!(parsers::is_supported(&format!(".{ext}")));
    }
}

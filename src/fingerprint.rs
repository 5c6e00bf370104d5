//! Fingerprint & Fileset Service (C1).
//!
//! Enumerates eligible files under a folder root and computes stable
//! content+mtime fingerprints, streaming file bytes through a hasher rather
//! than holding whole files in memory, grounded on the directory-skip and
//! path-validation conventions of `server/src/types.rs`.

use crate::error::{CoreError, CoreResult};
use crate::parsers;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Reserved cache directory name, excluded from every scan regardless of
/// whether it is hidden (it is not dot-prefixed).
pub const RESERVED_DIR: &str = ".folder-mcp";

/// A file discovered during enumeration, with its path relative to the root
/// using forward slashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumeratedFile {
    pub relative_path: String,
    pub size: u64,
    pub mtime: u64,
}

/// `(content-hash, size, mtime)` — equal fingerprints mean re-indexing is
/// unnecessary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub content_hash: String,
    pub size: u64,
    pub mtime: u64,
}

/// Normalize a host path under `root` to a root-relative, forward-slash path.
pub fn to_relative(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn is_hidden_or_reserved(rel_path: &str) -> bool {
    rel_path
        .split('/')
        .any(|part| part.starts_with('.') || part == RESERVED_DIR)
}

/// Walk `root`, yielding every eligible file (extension supported by the
/// parser module, not hidden, not under the reserved cache directory).
pub fn enumerate(root: &Path) -> CoreResult<Vec<EnumeratedFile>> {
    let mut out = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_exclude(false)
        .git_global(false)
        .ignore(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let abs = entry.path();
        let rel = match to_relative(root, abs) {
            Some(r) => r,
            None => continue,
        };
        if is_hidden_or_reserved(&rel) {
            continue;
        }
        let ext = abs.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !parsers::is_supported(ext) {
            continue;
        }

        let meta = match std::fs::metadata(abs) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        out.push(EnumeratedFile { relative_path: rel, size: meta.len(), mtime });
    }

    out.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(out)
}

/// Compute a stable fingerprint for a single file, streaming its bytes
/// through SHA-256 rather than reading the whole file into memory.
pub fn fingerprint(path: &Path) -> CoreResult<Fingerprint> {
    let meta = std::fs::metadata(path).map_err(|e| CoreError::io(path, e))?;
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let content_hash = format!("{:x}", hasher.finalize());
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Ok(Fingerprint { content_hash, size: meta.len(), mtime })
}

pub fn absolute_path(root: &Path, relative_path: &str) -> PathBuf {
    root.join(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn enumerate_skips_hidden_and_reserved_and_unsupported() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/config"), "x").unwrap();
        std::fs::create_dir_all(root.join(".folder-mcp")).unwrap();
        std::fs::write(root.join(".folder-mcp/vectors.db"), "x").unwrap();
        std::fs::write(root.join("notes.txt"), "hello").unwrap();
        std::fs::write(root.join("image.png"), "binary").unwrap();

        let files = enumerate(root).unwrap();
        let rel_paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(rel_paths, vec!["notes.txt"]);
    }

    #[test]
    fn fingerprint_is_stable_and_path_independent() {
        let dir = TempDir::new().unwrap();
        let p1 = dir.path().join("a.txt");
        let p2 = dir.path().join("b.txt");
        let mut f1 = File::create(&p1).unwrap();
        f1.write_all(b"same content").unwrap();
        let mut f2 = File::create(&p2).unwrap();
        f2.write_all(b"same content").unwrap();

        let fp1 = fingerprint(&p1).unwrap();
        let fp2 = fingerprint(&p2).unwrap();
        assert_eq!(fp1.content_hash, fp2.content_hash);
    }
}

//! Declaration extraction pipeline.
//!
//! Walks a file or directory, filters files by the annotation prefix, parses
//! the survivors and collects their annotated declarations. Results per file
//! are memoized by (path, prefix) and content fingerprint.

pub mod decl;
pub mod extractor;
pub mod walker;

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::{fingerprint, Caches};
use crate::error::Result;
use crate::source::{absolute, Parser};

pub use decl::{AnnotatedDecl, AnnotatedDecls, AnnotatedField, DeclKind, DeclNode};
pub use extractor::{extract_decls, parse_comment_groups};
pub use walker::{FileWalker, SKIP_DIRS};

pub struct Pipeline {
    parser: Arc<Parser>,
    walker: FileWalker,
}

impl Pipeline {
    pub fn new(parser: Arc<Parser>, walker: FileWalker) -> Self {
        Self { parser, walker }
    }

    pub fn parser(&self) -> &Arc<Parser> {
        &self.parser
    }

    pub fn caches(&self) -> &Arc<Caches> {
        self.parser.caches()
    }

    /// Annotated declarations of a file, or of every file under a directory
    /// in walk order. The first parse failure aborts a directory walk.
    pub fn parse_file_or_directory(&self, path: &Path, prefix: &str) -> Result<AnnotatedDecls> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_dir() {
            return Ok(self.parse_file_decls(path, prefix)?.as_ref().clone());
        }

        let files = self.walker.walk(path)?;
        tracing::debug!("parsing {} files under {}", files.len(), path.display());

        let per_file: Vec<Arc<AnnotatedDecls>> = files
            .par_iter()
            .map(|file| self.parse_file_decls(file, prefix))
            .collect::<Result<_>>()?;

        let mut decls = AnnotatedDecls::default();
        for file_decls in &per_file {
            decls.extend(file_decls);
        }
        Ok(decls)
    }

    /// Annotated declarations of one file.
    ///
    /// Files that are not Go sources or do not contain `prefix` yield an empty
    /// result without being parsed.
    pub fn parse_file_decls(&self, path: &Path, prefix: &str) -> Result<Arc<AnnotatedDecls>> {
        let path = absolute(path)?;
        if !self.parser.is_supported(&path) {
            return Ok(Arc::default());
        }

        let data = std::fs::read(&path)?;
        if !contains(&data, prefix.as_bytes()) {
            return Ok(Arc::default());
        }

        let version = fingerprint(&data);
        let key = (path.clone(), prefix.to_string());
        if let Some(hit) = self.caches().decls.get(&key, version) {
            tracing::debug!("annotated declarations cache hit: {}", path.display());
            return Ok(hit);
        }

        let unit = self.parser.parse_bytes(&path, data)?;
        self.caches()
            .decls
            .load(&key, version, || Ok(extract_decls(&unit, prefix)))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pipeline() -> Pipeline {
        let parser = Arc::new(Parser::new(Arc::new(Caches::new())));
        Pipeline::new(parser, FileWalker::new())
    }

    #[test]
    fn test_contains() {
        assert!(contains(b"// +gen:api", b"+gen:"));
        assert!(!contains(b"// nothing", b"+gen:"));
        assert!(contains(b"abc", b""));
    }

    #[test]
    fn test_filter_miss_is_not_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.go");
        std::fs::write(&path, "package p\n\nfunc F() {}\n").unwrap();

        let pipeline = pipeline();
        let decls = pipeline.parse_file_decls(&path, "+gen:").unwrap();
        assert!(decls.is_empty());
        assert!(pipeline.caches().units.is_empty());
    }

    #[test]
    fn test_non_go_file_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "+gen:api").unwrap();

        let decls = pipeline().parse_file_decls(&path, "+gen:").unwrap();
        assert!(decls.is_empty());
    }

    #[test]
    fn test_unchanged_file_returns_cached_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "package p\n\n// +gen:api\nfunc F() {}\n").unwrap();

        let pipeline = pipeline();
        let first = pipeline.parse_file_decls(&path, "+gen:").unwrap();
        let second = pipeline.parse_file_decls(&path, "+gen:").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 1);

        std::fs::write(&path, "package p\n\n// +gen:api\nfunc G() {}\n").unwrap();
        let third = pipeline.parse_file_decls(&path, "+gen:").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third[0].name(), "G");
    }

    #[test]
    fn test_prefixes_cached_separately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(
            &path,
            "package p\n\n// +gen:api\n// +other:x\nfunc F() {}\n",
        )
        .unwrap();

        let pipeline = pipeline();
        let gen = pipeline.parse_file_decls(&path, "+gen:").unwrap();
        let other = pipeline.parse_file_decls(&path, "+other:").unwrap();
        assert_eq!(gen[0].annotations, vec!["api"]);
        assert_eq!(other[0].annotations, vec!["x"]);
        assert!(Arc::ptr_eq(&gen[0].unit, &other[0].unit));
    }
}

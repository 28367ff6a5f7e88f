use std::path::Path;
use std::sync::Arc;

use crate::cache::{fingerprint, Caches};
use crate::error::{AnnogenError, Result};

use super::builder::{describe_error, UnitBuilder};
use super::grammar;
use super::unit::SourceUnit;

/// Parses Go files into [`SourceUnit`]s, memoized per path and content fingerprint.
pub struct Parser {
    caches: Arc<Caches>,
}

impl Parser {
    pub fn new(caches: Arc<Caches>) -> Self {
        Self { caches }
    }

    pub fn caches(&self) -> &Arc<Caches> {
        &self.caches
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        grammar::is_go_file(path)
    }

    /// Reads and parses `path`. An unchanged file returns the cached unit.
    pub fn parse_file(&self, path: &Path) -> Result<Arc<SourceUnit>> {
        let data = std::fs::read(path)?;
        self.parse_bytes(path, data)
    }

    /// Parses already-read file content, going through the unit cache.
    pub fn parse_bytes(&self, path: &Path, data: Vec<u8>) -> Result<Arc<SourceUnit>> {
        let version = fingerprint(&data);
        self.caches.units.load(&path.to_path_buf(), version, || {
            let source = String::from_utf8(data)
                .map_err(|e| AnnogenError::parse(path, format!("invalid UTF-8: {}", e)))?;
            tracing::debug!("parsing {}", path.display());
            self.parse_source(path, &source)
        })
    }

    /// Parses source text without consulting or filling the cache.
    pub fn parse_source(&self, path: &Path, source: &str) -> Result<SourceUnit> {
        let tree = grammar::parse_tree(source)
            .ok_or_else(|| AnnogenError::parse(path, "failed to parse source"))?;

        UnitBuilder::new(source).build(
            path,
            fingerprint(source.as_bytes()),
            &tree,
        )
    }

    /// Raw syntax tree, used to validate rewritten buffers.
    pub fn parse_tree(&self, source: &str) -> Option<tree_sitter::Tree> {
        grammar::parse_tree(source)
    }

    /// Syntax tree of `source`, or a description of its first syntax error.
    pub fn check_syntax(&self, source: &str) -> std::result::Result<tree_sitter::Tree, String> {
        let tree = self
            .parse_tree(source)
            .ok_or_else(|| "failed to parse source".to_string())?;
        if tree.root_node().has_error() {
            return Err(describe_error(&tree.root_node()));
        }
        Ok(tree)
    }
}

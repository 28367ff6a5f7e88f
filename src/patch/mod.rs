//! Source patch engine.
//!
//! A [`ModifySet`] stages, per file, import additions and raw replacements of
//! node spans. [`FileEdit::apply`] rewrites one file in a single pass: either
//! every staged change lands or the file is left untouched.

pub mod format;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::cache::fingerprint;
use crate::error::{AnnogenError, Result};
use crate::source::{absolute, Import, Imports, Parser, SourceUnit, Span};

use self::format::{canonicalize, protected_spans};

/// Pending rewrite of one file
pub struct FileEdit {
    unit: Arc<SourceUnit>,
    parser: Arc<Parser>,
    /// Imports the rewritten file will declare; only additions are written
    pub imports: Imports,
    /// Replacement bytes keyed by the span of the original node
    pub nodes: BTreeMap<Span, Vec<u8>>,
}

impl FileEdit {
    pub fn new(unit: Arc<SourceUnit>, parser: Arc<Parser>) -> Self {
        Self {
            imports: unit.imports.clone(),
            unit,
            parser,
            nodes: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.unit.path
    }

    /// Unit the edit was staged against; spans refer to its source.
    pub fn unit(&self) -> &Arc<SourceUnit> {
        &self.unit
    }

    /// Replaces the bytes of `span` with `bytes`. A later call for the same span wins.
    pub fn replace(&mut self, span: Span, bytes: impl Into<Vec<u8>>) {
        self.nodes.insert(span, bytes.into());
    }

    /// Adds an import and returns the local name to refer to it by.
    pub fn add_import(&mut self, path: &str) -> String {
        self.imports.add(path)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.imports.added_since(&self.unit.imports).is_empty()
    }

    /// Rewrites the file on disk.
    ///
    /// Fails without writing when the file changed since it was staged, when
    /// replacements overlap or fall outside the file, or when the result does
    /// not parse. A syntax failure carries the unformatted buffer.
    pub fn apply(&self) -> Result<()> {
        let path = self.path();
        let data = std::fs::read(path)
            .map_err(|e| AnnogenError::patch(path, format!("cannot read: {}", e)))?;
        if fingerprint(&data) != self.unit.fingerprint {
            return Err(AnnogenError::patch(path, "file changed since the edit was staged"));
        }

        let buffer = splice(path, &data, &self.replacements())?;
        let source = match String::from_utf8(buffer) {
            Ok(source) => source,
            Err(e) => {
                return Err(AnnogenError::Format {
                    path: path.to_path_buf(),
                    message: "rewritten source is not UTF-8".to_string(),
                    buffer: e.into_bytes(),
                })
            }
        };

        let formatted = self.format(&source)?;
        write_atomic(path, formatted.as_bytes())?;
        tracing::debug!("patched {}", path.display());
        Ok(())
    }

    /// Node replacements plus insertions for added imports
    fn replacements(&self) -> Vec<(Span, Vec<u8>)> {
        let mut replacements: Vec<(Span, Vec<u8>)> = self
            .nodes
            .iter()
            .map(|(span, bytes)| (*span, bytes.clone()))
            .collect();

        let added = self.imports.added_since(&self.unit.imports);
        if !added.is_empty() {
            replacements.extend(self.import_insertions(&added));
        }

        replacements.sort_by_key(|(span, _)| *span);
        replacements
    }

    /// Zero-width insertions adding `added`; existing import text is kept.
    ///
    /// New specs go into the last parenthesized import declaration, before
    /// the first spec with a greater path. Without one, a new block follows
    /// the last import declaration or the package clause.
    fn import_insertions(&self, added: &[&Import]) -> Vec<(Span, Vec<u8>)> {
        let source = self.unit.source.as_str();
        let block = self
            .unit
            .import_decls
            .iter()
            .rev()
            .find_map(|d| d.close.map(|close| (d, close)));

        let Some((decl, close)) = block else {
            let at = match self.unit.import_decls.last() {
                Some(last) => line_end(source, last.span.end),
                None => self.unit.package_span.end,
            };
            let block = Imports::new(added.iter().map(|i| (*i).clone()).collect()).render();
            return vec![(Span::new(at, at), format!("\n\n{}", block).into_bytes())];
        };

        let mut inserts: BTreeMap<usize, String> = BTreeMap::new();
        for import in added {
            let spec = import.render();
            let next = decl.specs.iter().find(|(_, path)| *path > import.path);
            let (at, text) = match next {
                Some((span, _)) => match spec_line_start(source, span.start) {
                    Some(start) => (start, format!("\t{}\n", spec)),
                    None => (span.start, format!("{}; ", spec)),
                },
                None => match line_start(source, close) {
                    Some(start) => (start, format!("\t{}\n", spec)),
                    None => (close, format!("\n\t{}", spec)),
                },
            };
            inserts.entry(at).or_default().push_str(&text);
        }

        inserts
            .into_iter()
            .map(|(at, text)| {
                // `)` sharing a line with the last spec moves to its own line
                let text = if at == close && !text.starts_with('\t') {
                    format!("{}\n", text)
                } else {
                    text
                };
                (Span::new(at, at), text.into_bytes())
            })
            .collect()
    }

    fn format(&self, source: &str) -> Result<String> {
        match self.parser.check_syntax(source) {
            Ok(tree) => Ok(canonicalize(source, &protected_spans(&tree, source))),
            Err(message) => Err(AnnogenError::Format {
                path: self.path().to_path_buf(),
                message,
                buffer: source.as_bytes().to_vec(),
            }),
        }
    }
}

/// Start of the line holding `at` when only whitespace precedes it there
fn line_start(source: &str, at: usize) -> Option<usize> {
    let start = source[..at].rfind('\n').map_or(0, |i| i + 1);
    source[start..at].trim().is_empty().then_some(start)
}

/// Like [`line_start`], moved up over comment lines directly above the spec
fn spec_line_start(source: &str, at: usize) -> Option<usize> {
    let mut start = line_start(source, at)?;
    while start > 0 {
        let prev = source[..start - 1].rfind('\n').map_or(0, |i| i + 1);
        if !source[prev..start - 1].trim_start().starts_with("//") {
            break;
        }
        start = prev;
    }
    Some(start)
}

/// Offset of the newline ending the line that holds `at`, or the end of `source`
fn line_end(source: &str, at: usize) -> usize {
    source[at..].find('\n').map_or(source.len(), |i| at + i)
}

/// Applies sorted, non-overlapping replacements to `data`.
fn splice(path: &Path, data: &[u8], replacements: &[(Span, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut cursor = 0;

    for (span, bytes) in replacements {
        if span.start > span.end || span.end > data.len() {
            return Err(AnnogenError::patch(
                path,
                format!("span {}..{} outside file of {} bytes", span.start, span.end, data.len()),
            ));
        }
        if span.start < cursor {
            return Err(AnnogenError::patch(
                path,
                format!("span {}..{} overlaps a previous replacement", span.start, span.end),
            ));
        }
        out.extend_from_slice(&data[cursor..span.start]);
        out.extend_from_slice(bytes);
        cursor = span.end;
    }

    out.extend_from_slice(&data[cursor..]);
    Ok(out)
}

/// Writes through a temporary file in the same directory, then renames.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path)
        .map_err(|e| AnnogenError::patch(path, format!("cannot replace file: {}", e.error)))?;
    Ok(())
}

/// Edits staged for several files, applied in path order
pub struct ModifySet {
    parser: Arc<Parser>,
    edits: BTreeMap<PathBuf, FileEdit>,
}

impl ModifySet {
    pub fn new(parser: Arc<Parser>) -> Self {
        Self {
            parser,
            edits: BTreeMap::new(),
        }
    }

    /// Edit for `path`, staged against its current content on first use.
    pub fn add(&mut self, path: &Path) -> Result<&mut FileEdit> {
        let path = absolute(path)?;
        if !self.edits.contains_key(&path) {
            let unit = self.parser.parse_file(&path)?;
            let edit = FileEdit::new(unit, Arc::clone(&self.parser));
            self.edits.insert(path.clone(), edit);
        }
        self.edits
            .get_mut(&path)
            .ok_or_else(|| AnnogenError::patch(&path, "edit not staged"))
    }

    pub fn get(&self, path: &Path) -> Option<&FileEdit> {
        self.edits.get(&absolute(path).ok()?)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies every non-empty edit; stops at the first failing file.
    pub fn apply(&self) -> Result<()> {
        for edit in self.edits.values().filter(|e| !e.is_empty()) {
            edit.apply()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Caches;
    use tempfile::TempDir;

    fn modify_set() -> ModifySet {
        ModifySet::new(Arc::new(Parser::new(Arc::new(Caches::new()))))
    }

    fn span_of(source: &str, needle: &str) -> Span {
        let start = source.find(needle).unwrap();
        Span::new(start, start + needle.len())
    }

    #[test]
    fn test_splice_in_order() {
        let out = splice(
            Path::new("t.go"),
            b"abcdef",
            &[(Span::new(1, 2), b"X".to_vec()), (Span::new(4, 4), b"Y".to_vec())],
        )
        .unwrap();
        assert_eq!(out, b"aXcdYef");
    }

    #[test]
    fn test_splice_rejects_overlap_and_range() {
        let overlap = splice(
            Path::new("t.go"),
            b"abcdef",
            &[(Span::new(1, 3), vec![]), (Span::new(2, 4), vec![])],
        );
        assert!(matches!(overlap, Err(AnnogenError::Patch { .. })));

        let range = splice(Path::new("t.go"), b"abc", &[(Span::new(2, 9), vec![])]);
        assert!(matches!(range, Err(AnnogenError::Patch { .. })));
    }

    #[test]
    fn test_replace_node_keeps_other_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        let source = "package a\n\n// Doc stays.\nfunc Old() int { return 1 }\n\nvar x = 2 // trailing\n";
        std::fs::write(&path, source).unwrap();

        let mut set = modify_set();
        let edit = set.add(&path).unwrap();
        edit.replace(span_of(source, "Old"), "New");
        set.apply().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            source.replace("Old", "New")
        );
    }

    #[test]
    fn test_import_added_without_import_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "package a\n\nvar _ = 1\n").unwrap();

        let mut set = modify_set();
        assert_eq!(set.add(&path).unwrap().add_import("fmt"), "fmt");
        set.apply().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "package a\n\nimport (\n\t\"fmt\"\n)\n\nvar _ = 1\n"
        );
    }

    #[test]
    fn test_duplicate_import_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        let source = "package a\n\nimport \"time\"\n\nvar _ = time.Now\n";
        std::fs::write(&path, source).unwrap();

        let mut set = modify_set();
        let edit = set.add(&path).unwrap();
        assert_eq!(edit.add_import("time"), "time");
        assert!(edit.is_empty());
        set.apply().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_import_added_after_single_imports_keeps_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        let source = "package p\n\nimport \"fmt\" // printing\n\n// keep me: explains the embed\nimport _ \"embed\"\n\nvar _ = fmt.Println\n";
        std::fs::write(&path, source).unwrap();

        let mut set = modify_set();
        assert_eq!(set.add(&path).unwrap().add_import("context"), "context");
        set.apply().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "package p\n\nimport \"fmt\" // printing\n\n// keep me: explains the embed\nimport _ \"embed\"\n\nimport (\n\t\"context\"\n)\n\nvar _ = fmt.Println\n"
        );
    }

    #[test]
    fn test_import_inserted_into_block_keeps_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        let source = "package p\n\nimport (\n\t\"fmt\" // printing\n\n\t// os is for exit codes\n\t\"os\"\n)\n\nvar _ = fmt.Println\n";
        std::fs::write(&path, source).unwrap();

        let mut set = modify_set();
        let edit = set.add(&path).unwrap();
        edit.add_import("io");
        edit.add_import("context");
        edit.add_import("time");
        set.apply().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "package p\n\nimport (\n\t\"context\"\n\t\"fmt\" // printing\n\n\t\"io\"\n\t// os is for exit codes\n\t\"os\"\n\t\"time\"\n)\n\nvar _ = fmt.Println\n"
        );
    }

    #[test]
    fn test_import_appended_to_one_line_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "package p\n\nimport (\"fmt\")\n\nvar _ = fmt.Println\n").unwrap();

        let mut set = modify_set();
        set.add(&path).unwrap().add_import("os");
        set.apply().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "package p\n\nimport (\"fmt\"\n\t\"os\"\n)\n\nvar _ = fmt.Println\n"
        );
    }

    #[test]
    fn test_syntax_error_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        let source = "package a\n\nfunc F() {}\n";
        std::fs::write(&path, source).unwrap();

        let mut set = modify_set();
        set.add(&path)
            .unwrap()
            .replace(span_of(source, "{}"), "{");
        let err = set.apply().unwrap_err();

        match err {
            AnnogenError::Format { buffer, .. } => {
                assert_eq!(buffer, b"package a\n\nfunc F() {\n");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_stale_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "package a\n").unwrap();

        let mut set = modify_set();
        set.add(&path).unwrap().replace(Span::new(8, 9), "b");
        std::fs::write(&path, "package c\n").unwrap();

        assert!(matches!(set.apply(), Err(AnnogenError::Patch { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "package c\n");
    }

    #[test]
    fn test_add_returns_same_edit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "package a\n").unwrap();

        let mut set = modify_set();
        set.add(&path).unwrap().add_import("fmt");
        assert_eq!(set.add(&path).unwrap().imports.len(), 1);
        assert_eq!(set.len(), 1);
    }
}

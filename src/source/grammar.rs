//! Go grammar handle and the compiled import spec query.

use std::path::Path;

use once_cell::sync::OnceCell;
use tree_sitter::{Language, Query, Tree};

/// Captures `@import_name` (optional) and `@import_path` per import spec
const IMPORTS_QUERY: &str = r#"
(import_spec
    name: (_)? @import_name
    path: (_) @import_path
) @import
"#;

static GO_IMPORTS_QUERY: OnceCell<Query> = OnceCell::new();

pub fn language() -> Language {
    tree_sitter_go::LANGUAGE.into()
}

/// Files the walker and parser accept: `*.go`
pub fn is_go_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("go")
}

/// Import spec query, compiled once per process.
pub fn imports_query() -> Option<&'static Query> {
    GO_IMPORTS_QUERY
        .get_or_try_init(|| Query::new(&language(), IMPORTS_QUERY))
        .ok()
}

pub fn parse_tree(source: &str) -> Option<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language()).ok()?;
    parser.parse(source, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_go_file() {
        assert!(is_go_file(Path::new("pkg/model.go")));
        assert!(!is_go_file(Path::new("model.go.tmpl")));
        assert!(!is_go_file(Path::new("Makefile")));
    }

    #[test]
    fn test_imports_query_compiles() {
        let query = imports_query().unwrap();
        assert!(query.capture_names().contains(&"import_path"));
    }

    #[test]
    fn test_parse_tree() {
        let tree = parse_tree("package p\n").unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
        assert!(!tree.root_node().has_error());
    }
}

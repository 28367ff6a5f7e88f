//! Integration tests for the extraction pipeline over real directory trees.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use annogen::plugin::{Plugin, PluginArgs};
use annogen::resolver::Offline;
use annogen::{AnnogenError, Caches, Config, DeclEntities, DeclKind, Engine};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn engine(config: &Config) -> Engine {
    Engine::with_toolchain(Arc::new(Caches::new()), config, Arc::new(Offline))
}

struct Column;

impl Plugin for Column {
    fn name(&self) -> &str {
        "column"
    }

    fn args(&self) -> PluginArgs {
        PluginArgs::new(&["table:table name"], &[("soft", "soft delete")])
    }

    fn description(&self) -> &str {
        "test plugin"
    }

    fn run(&self, _entities: DeclEntities) -> annogen::Result<()> {
        Ok(())
    }
}

fn create_tree() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path();

    write(
        root,
        "model/user.go",
        r#"package model

// User is a person.
// +gen:column:users:soft
type User struct {
	// +gen:column:id
	ID int64
	Name string
}

// +gen:column:log
var (
	A = 1
	// +gen:column:b
	B = 2
)
"#,
    );
    write(root, "model/plain.go", "package model\n\nvar Plain = 1\n");
    write(
        root,
        "api/handler.go",
        "package api\n\n// +gen:column:handlers\nfunc Handle() {}\n",
    );
    write(
        root,
        "vendor/dep/dep.go",
        "package dep\n\n// +gen:column:vendored\ntype Dep int\n",
    );
    write(
        root,
        "generated/out.go",
        "package generated\n\n// +gen:column:out\ntype Out int\n",
    );
    write(root, ".cache/x.go", "package x\n\n// +gen:column:hidden\ntype X int\n");
    write(root, "notes/readme.md", "+gen:column:nope\n");

    dir
}

#[test]
fn test_directory_walk_in_order() {
    let dir = create_tree();
    let engine = engine(&Config::default());

    let decls = engine
        .pipeline()
        .parse_file_or_directory(dir.path(), "+gen:")
        .unwrap();

    let names: Vec<&str> = decls.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Handle", "Out", "User", "A", "B"]);
    assert_eq!(decls[0].kind, DeclKind::Function);
    assert_eq!(decls[2].kind, DeclKind::Struct);
    assert_eq!(decls[2].docs, vec!["User is a person."]);
}

#[test]
fn test_configured_skip_dirs() {
    let dir = create_tree();
    let config = Config::parse("skip-dirs = [\"generated\"]\n").unwrap();
    let decls = engine(&config)
        .pipeline()
        .parse_file_or_directory(dir.path(), "+gen:")
        .unwrap();

    let names: Vec<&str> = decls.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Handle", "User", "A", "B"]);
}

#[test]
fn test_grouped_var_binding() {
    let dir = create_tree();
    let engine = engine(&Config::default());
    let decls = engine
        .pipeline()
        .parse_file_or_directory(&dir.path().join("model"), "+gen:")
        .unwrap();

    let entities = decls.parse(&Column, &Default::default());
    let bound: Vec<(&str, &str)> = entities
        .iter()
        .map(|e| (e.name(), e.args[0].as_str()))
        .collect();
    assert_eq!(
        bound,
        vec![("User", "users"), ("A", "log"), ("B", "log"), ("B", "b")]
    );

    let user = &entities[0];
    assert!(user.options.exist("soft"));
    let fields = user.parse_fields(1, &Default::default());
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name(), "ID");
    assert_eq!(fields[0].args, vec!["id"]);
}

#[test]
fn test_unchanged_files_are_cached() {
    let dir = create_tree();
    let engine = engine(&Config::default());
    let file = dir.path().join("model/user.go");

    let first = engine.pipeline().parse_file_decls(&file, "+gen:").unwrap();
    let second = engine.pipeline().parse_file_decls(&file, "+gen:").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    fs::write(&file, "package model\n\n// +gen:column:t\ntype T int\n").unwrap();
    let third = engine.pipeline().parse_file_decls(&file, "+gen:").unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third[0].name(), "T");
}

#[test]
fn test_parse_failure_aborts_walk() {
    let dir = create_tree();
    write(dir.path(), "broken/bad.go", "package broken\n\n// +gen:column:x\nfunc {\n");

    let result = engine(&Config::default())
        .pipeline()
        .parse_file_or_directory(dir.path(), "+gen:");
    assert!(matches!(result, Err(AnnogenError::Parse { .. })));
}

#[test]
fn test_broken_file_without_prefix_is_skipped() {
    let dir = create_tree();
    write(dir.path(), "broken/bad.go", "package broken\n\nfunc {\n");

    let decls = engine(&Config::default())
        .pipeline()
        .parse_file_or_directory(dir.path(), "+gen:")
        .unwrap();
    assert_eq!(decls.len(), 5);
}

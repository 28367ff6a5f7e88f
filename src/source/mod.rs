//! Source unit model: parsed Go files with their declarations and imports.

mod builder;
pub mod comments;
pub mod fields;
pub mod grammar;
pub mod imports;
pub mod parser;
pub mod unit;

use std::path::{Path, PathBuf};

pub use fields::{assert_func_type, extract_anonymous_name, extract_struct_field_names};
pub use imports::{default_import_name, Import, Imports};
pub use parser::Parser;
pub use unit::{
    is_exported, CommentGroup, Decl, Field, FuncDecl, GenDecl, GenToken, ImportDecl, Object,
    SourceUnit, Span, Spec, TypeExpr, TypeKind, TypeSpec, ValueSpec,
};

/// `path` joined onto the working directory when relative. Not canonicalized.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

//! Owned declaration model of one parsed Go file.
//!
//! The tree-sitter tree is lowered into these types once per content version
//! so that units can be cached and shared across threads without borrowing
//! from the parser.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::imports::Imports;

/// Byte extent of a node in the unit's source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn of(node: &tree_sitter::Node) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

/// One `import` declaration as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub span: Span,
    /// Offset of the closing `)` of a parenthesized declaration
    pub close: Option<usize>,
    /// Extent and path of every spec, in source order
    pub specs: Vec<(Span, String)>,
}

/// Adjacent comments attached to a declaration, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    pub span: Span,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Ident(String),
    Qualified { package: String, name: String },
    Pointer(Box<TypeExpr>),
    Struct(Vec<Field>),
    Interface(Vec<Field>),
    Map,
    Array,
    Func,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub span: Span,
    pub text: String,
    pub kind: TypeKind,
}

impl TypeExpr {
    /// Concrete types terminate cross-package lookups.
    pub fn is_concrete(&self) -> bool {
        !matches!(self.kind, TypeKind::Ident(_) | TypeKind::Qualified { .. })
    }
}

/// A struct field or interface element. Embedded entries have no names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
    pub span: Span,
    pub doc: Option<CommentGroup>,
    pub comment: Option<CommentGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenToken {
    Type,
    Var,
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub name: String,
    pub name_span: Span,
    /// `type T = U`
    pub alias: bool,
    pub ty: TypeExpr,
    pub span: Span,
    pub doc: Option<CommentGroup>,
    pub comment: Option<CommentGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<TypeExpr>,
    pub span: Span,
    pub doc: Option<CommentGroup>,
    pub comment: Option<CommentGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Type(TypeSpec),
    Value(ValueSpec),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenDecl {
    pub token: GenToken,
    pub span: Span,
    /// Declared with parentheses
    pub grouped: bool,
    pub doc: Option<CommentGroup>,
    pub specs: Vec<Spec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub name_span: Span,
    pub receiver: Option<String>,
    pub signature: String,
    pub span: Span,
    pub doc: Option<CommentGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Gen(GenDecl),
    Func(FuncDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectRef {
    Func(usize),
    Spec(usize, usize),
}

/// A package-scope object found by [`SourceUnit::lookup`]
#[derive(Debug, Clone, Copy)]
pub enum Object<'a> {
    Func(&'a FuncDecl),
    Type(&'a TypeSpec),
    Value(&'a ValueSpec),
}

#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub source: String,
    pub fingerprint: u64,
    pub package: String,
    pub package_span: Span,
    pub imports: Imports,
    /// Import declarations in source order
    pub import_decls: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
    objects: HashMap<String, ObjectRef>,
}

impl SourceUnit {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        path: PathBuf,
        source: String,
        fingerprint: u64,
        package: String,
        package_span: Span,
        imports: Imports,
        import_decls: Vec<ImportDecl>,
        decls: Vec<Decl>,
    ) -> Self {
        let mut objects = HashMap::new();
        for (i, decl) in decls.iter().enumerate() {
            match decl {
                // methods live in their receiver's method set, not the package scope
                Decl::Func(func) if func.receiver.is_none() => {
                    objects.insert(func.name.clone(), ObjectRef::Func(i));
                }
                Decl::Func(_) => {}
                Decl::Gen(gen) => {
                    for (j, spec) in gen.specs.iter().enumerate() {
                        match spec {
                            Spec::Type(ts) => {
                                objects.insert(ts.name.clone(), ObjectRef::Spec(i, j));
                            }
                            Spec::Value(vs) => {
                                for name in vs.names.iter().filter(|n| n.as_str() != "_") {
                                    objects.insert(name.clone(), ObjectRef::Spec(i, j));
                                }
                            }
                        }
                    }
                }
            }
        }

        Self {
            path,
            source,
            fingerprint,
            package,
            package_span,
            imports,
            import_decls,
            decls,
            objects,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Object<'_>> {
        match *self.objects.get(name)? {
            ObjectRef::Func(i) => match &self.decls[i] {
                Decl::Func(func) => Some(Object::Func(func)),
                Decl::Gen(_) => None,
            },
            ObjectRef::Spec(i, j) => match &self.decls[i] {
                Decl::Gen(gen) => match &gen.specs[j] {
                    Spec::Type(ts) => Some(Object::Type(ts)),
                    Spec::Value(vs) => Some(Object::Value(vs)),
                },
                Decl::Func(_) => None,
            },
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeSpec> {
        match self.lookup(name)? {
            Object::Type(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.start..span.end).unwrap_or("")
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Go exported identifiers start with an upper-case letter
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::annotation::{parse_annotation, DeclEntities, DeclEntity, FieldEntity};
use crate::plugin::Plugin;
use crate::resolver::ModuleResolver;
use crate::source::{Field, FuncDecl, SourceUnit, Span, TypeSpec, ValueSpec};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\.(Name|Package|Filename)\s*\}\}").unwrap());

/// Shape of an annotated declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `type T interface{}`
    Interface,
    /// `type T struct{}`
    Struct,
    /// `type T map[K]V`
    Map,
    /// `type T []E` or `type T [N]E`
    Array,
    /// `type T func()`
    Func,
    /// `type T U`, `type T = U`, `type T pkg.U`, `type T *U`
    Refer,
    /// `func F()`
    Function,
    /// `var v = 1`, `const c = 1`
    Value,
}

#[derive(Debug, Clone)]
pub enum DeclNode {
    Type(TypeSpec),
    Function(FuncDecl),
    Value(ValueSpec),
}

/// A top-level declaration with at least one annotation line
#[derive(Debug)]
pub struct AnnotatedDecl {
    pub unit: Arc<SourceUnit>,
    pub kind: DeclKind,
    pub node: DeclNode,
    pub docs: Vec<String>,
    pub annotations: Vec<String>,
    /// Annotated struct fields or interface methods
    pub fields: Vec<AnnotatedField>,
}

/// A named struct field or interface method with its own annotations
#[derive(Debug, Clone)]
pub struct AnnotatedField {
    /// Name of the declaring type
    pub owner: String,
    pub field: Field,
    pub docs: Vec<String>,
    pub annotations: Vec<String>,
}

impl AnnotatedField {
    pub fn names(&self) -> &[String] {
        &self.field.names
    }

    pub fn name(&self) -> &str {
        self.field.names.first().map(String::as_str).unwrap_or("")
    }
}

impl AnnotatedDecl {
    /// Declared name. Value specs declaring several names have none.
    pub fn name(&self) -> &str {
        match &self.node {
            DeclNode::Type(spec) => &spec.name,
            DeclNode::Function(func) => &func.name,
            DeclNode::Value(spec) if spec.names.len() == 1 => &spec.names[0],
            DeclNode::Value(_) => "",
        }
    }

    /// Base name of the declaring file
    pub fn filename(&self) -> String {
        self.unit.filename()
    }

    /// Package clause of the declaring file
    pub fn package(&self) -> &str {
        &self.unit.package
    }

    pub fn path(&self) -> &Path {
        &self.unit.path
    }

    /// Extent of the declaration, without its doc comment
    pub fn span(&self) -> Span {
        match &self.node {
            DeclNode::Type(spec) => spec.span,
            DeclNode::Function(func) => func.span,
            DeclNode::Value(spec) => spec.span,
        }
    }

    /// 1-based line the declaration starts on
    pub fn line(&self) -> usize {
        let start = self.span().start.min(self.unit.source.len());
        self.unit.source.as_bytes()[..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1
    }

    pub fn dir(&self) -> &Path {
        self.unit.dir()
    }

    /// Output path for a generated file.
    ///
    /// `{{ .Name }}`, `{{ .Package }}` and `{{ .Filename }}` are substituted
    /// first. A filename without `.go` suffix is a directory and receives
    /// `default_name`. Absolute filenames are rooted at the module directory,
    /// relative ones at the declaration directory.
    pub fn rel_filename(
        &self,
        filename: &str,
        default_name: &str,
        resolver: &ModuleResolver,
    ) -> PathBuf {
        let mut filename = PLACEHOLDER
            .replace_all(filename, |caps: &Captures| match &caps[1] {
                "Name" => self.name().to_string(),
                "Package" => self.package().to_string(),
                _ => self.filename(),
            })
            .into_owned();

        if !filename.ends_with(".go") {
            let base = format!("{}.go", default_name.trim_end_matches(".go"));
            filename = Path::new(&filename).join(base).to_string_lossy().into_owned();
        }

        let dir = self.dir();
        if Path::new(&filename).is_absolute() {
            let root = resolver
                .mod_file(dir)
                .and_then(|m| m.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| dir.to_path_buf());
            root.join(filename.trim_start_matches('/'))
        } else {
            dir.join(filename)
        }
    }

    /// Binds every annotation matching plugin `name` into an entity.
    pub fn bind(
        self: &Arc<Self>,
        name: &str,
        args_count: usize,
        ext_options: &BTreeMap<String, String>,
    ) -> Vec<DeclEntity> {
        self.annotations
            .iter()
            .filter_map(|a| parse_annotation(a, name, args_count, ext_options))
            .map(|parsed| DeclEntity {
                decl: Arc::clone(self),
                plugin: name.to_string(),
                args: parsed.args,
                options: parsed.options,
            })
            .collect()
    }

    /// Binds the annotations of field `index` the same way.
    pub fn bind_field(
        self: &Arc<Self>,
        index: usize,
        name: &str,
        args_count: usize,
        ext_options: &BTreeMap<String, String>,
    ) -> Vec<FieldEntity> {
        let Some(field) = self.fields.get(index) else {
            return Vec::new();
        };
        field
            .annotations
            .iter()
            .filter_map(|a| parse_annotation(a, name, args_count, ext_options))
            .map(|parsed| FieldEntity {
                decl: Arc::clone(self),
                index,
                args: parsed.args,
                options: parsed.options,
            })
            .collect()
    }
}

/// Annotated declarations in source order
#[derive(Debug, Clone, Default)]
pub struct AnnotatedDecls(Vec<Arc<AnnotatedDecl>>);

impl AnnotatedDecls {
    pub fn new(decls: Vec<Arc<AnnotatedDecl>>) -> Self {
        Self(decls)
    }

    pub fn into_inner(self) -> Vec<Arc<AnnotatedDecl>> {
        self.0
    }

    pub fn extend(&mut self, other: &AnnotatedDecls) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Entities for `plugin`, one per matching annotation line.
    pub fn parse(&self, plugin: &dyn Plugin, ext_options: &BTreeMap<String, String>) -> DeclEntities {
        let name = plugin.name();
        let args_count = plugin.args().args.len();
        self.0
            .iter()
            .flat_map(|decl| decl.bind(name, args_count, ext_options))
            .collect()
    }
}

impl Deref for AnnotatedDecls {
    type Target = [Arc<AnnotatedDecl>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<Arc<AnnotatedDecl>> for AnnotatedDecls {
    fn from_iter<T: IntoIterator<Item = Arc<AnnotatedDecl>>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AnnotatedDecls {
    type Item = &'a Arc<AnnotatedDecl>;
    type IntoIter = std::slice::Iter<'a, Arc<AnnotatedDecl>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub mod annotation;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod patch;
pub mod pipeline;
pub mod plugin;
pub mod resolver;
pub mod source;

pub use annotation::{
    parse_annotation, DeclEntities, DeclEntity, FieldEntities, FieldEntity, Options,
    ParsedAnnotation,
};
pub use cache::{fingerprint, CacheSnapshot, Caches, VersionStore};
pub use config::{Config, DEFAULT_PREFIX};
pub use engine::Engine;
pub use error::{AnnogenError, Result};
pub use patch::{FileEdit, ModifySet};
pub use pipeline::{AnnotatedDecl, AnnotatedDecls, AnnotatedField, DeclKind, DeclNode, Pipeline};
pub use plugin::{Plugin, PluginArgs, PluginEntities, PluginEntity, PluginRegistry};
pub use resolver::{fix_package, is_standard_import_path, GoToolchain, ModuleResolver, Toolchain};
pub use source::{Import, Imports, Parser, SourceUnit, Span, TypeExpr, TypeKind};

use std::sync::Arc;

use crate::source::{CommentGroup, Decl, Field, FuncDecl, GenDecl, SourceUnit, Spec, TypeKind};

use super::decl::{AnnotatedDecl, AnnotatedDecls, AnnotatedField, DeclKind, DeclNode};

/// Splits comment groups into documentation and annotation lines.
///
/// Every line whose trimmed text starts with `prefix` becomes an annotation
/// (with the prefix removed); the rest stay documentation. Relative order is
/// preserved within each bucket. An empty prefix yields no annotations.
pub fn parse_comment_groups(
    prefix: &str,
    groups: &[Option<&CommentGroup>],
) -> (Vec<String>, Vec<String>) {
    let lines: Vec<String> = groups
        .iter()
        .flatten()
        .flat_map(|g| {
            g.text()
                .trim()
                .split('\n')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    if prefix.is_empty() {
        return (lines, Vec::new());
    }

    let mut docs = Vec::new();
    let mut annotations = Vec::new();
    for line in lines {
        match line.trim().strip_prefix(prefix) {
            Some(annotation) => annotations.push(annotation.to_string()),
            None => docs.push(line),
        }
    }
    (docs, annotations)
}

/// Annotated declarations of `unit`, in source order
pub fn extract_decls(unit: &Arc<SourceUnit>, prefix: &str) -> AnnotatedDecls {
    let mut decls = Vec::new();
    for decl in &unit.decls {
        match decl {
            Decl::Func(func) => decls.extend(func_decl(unit, func, prefix)),
            Decl::Gen(gen) => decls.extend(gen_decl(unit, gen, prefix)),
        }
    }
    AnnotatedDecls::new(decls.into_iter().map(Arc::new).collect())
}

fn func_decl(unit: &Arc<SourceUnit>, func: &FuncDecl, prefix: &str) -> Option<AnnotatedDecl> {
    let (docs, annotations) = parse_comment_groups(prefix, &[func.doc.as_ref()]);
    if annotations.is_empty() {
        return None;
    }
    Some(AnnotatedDecl {
        unit: Arc::clone(unit),
        kind: DeclKind::Function,
        node: DeclNode::Function(func.clone()),
        docs,
        annotations,
        fields: Vec::new(),
    })
}

/// Group annotations go to every spec; group docs only to a lone spec.
fn gen_decl(unit: &Arc<SourceUnit>, gen: &GenDecl, prefix: &str) -> Vec<AnnotatedDecl> {
    let (group_docs, group_annotations) = parse_comment_groups(prefix, &[gen.doc.as_ref()]);
    let single = !gen.grouped || gen.specs.len() == 1;

    let mut decls = Vec::new();
    for spec in &gen.specs {
        let (doc, comment) = match spec {
            Spec::Type(ts) => (ts.doc.as_ref(), ts.comment.as_ref()),
            Spec::Value(vs) => (vs.doc.as_ref(), vs.comment.as_ref()),
        };
        let (spec_docs, spec_annotations) = parse_comment_groups(prefix, &[doc, comment]);

        let annotations: Vec<String> = group_annotations
            .iter()
            .cloned()
            .chain(spec_annotations)
            .collect();
        if annotations.is_empty() {
            continue;
        }

        let docs = if single {
            group_docs.iter().cloned().chain(spec_docs).collect()
        } else {
            spec_docs
        };

        let (kind, node, fields) = match spec {
            Spec::Value(vs) => (DeclKind::Value, DeclNode::Value(vs.clone()), Vec::new()),
            Spec::Type(ts) => {
                let (kind, fields) = match &ts.ty.kind {
                    TypeKind::Interface(members) => {
                        (DeclKind::Interface, annotated_fields(&ts.name, members, prefix))
                    }
                    TypeKind::Struct(members) => {
                        (DeclKind::Struct, annotated_fields(&ts.name, members, prefix))
                    }
                    TypeKind::Map => (DeclKind::Map, Vec::new()),
                    TypeKind::Array => (DeclKind::Array, Vec::new()),
                    TypeKind::Func => (DeclKind::Func, Vec::new()),
                    TypeKind::Ident(_) | TypeKind::Qualified { .. } | TypeKind::Pointer(_) => {
                        (DeclKind::Refer, Vec::new())
                    }
                    TypeKind::Other(other) => {
                        tracing::debug!("skipping annotated type {} of kind {}", ts.name, other);
                        continue;
                    }
                };
                (kind, DeclNode::Type(ts.clone()), fields)
            }
        };

        decls.push(AnnotatedDecl {
            unit: Arc::clone(unit),
            kind,
            node,
            docs,
            annotations,
            fields,
        });
    }
    decls
}

/// Embedded members carry no name and are never annotated.
fn annotated_fields(owner: &str, members: &[Field], prefix: &str) -> Vec<AnnotatedField> {
    members
        .iter()
        .filter(|f| !f.names.is_empty())
        .filter_map(|f| {
            let (docs, annotations) =
                parse_comment_groups(prefix, &[f.doc.as_ref(), f.comment.as_ref()]);
            (!annotations.is_empty()).then(|| AnnotatedField {
                owner: owner.to_string(),
                field: f.clone(),
                docs,
                annotations,
            })
        })
        .collect()
}

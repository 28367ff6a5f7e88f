//! Lowers a tree-sitter Go syntax tree into the [`SourceUnit`] model.

use std::path::Path;

use tree_sitter::{Node, StreamingIterator};

use crate::error::{AnnogenError, Result};

use super::grammar;
use super::imports::{Import, Imports};
use super::unit::{
    CommentGroup, Decl, Field, FuncDecl, GenDecl, GenToken, ImportDecl, SourceUnit, Span, Spec,
    TypeExpr, TypeKind, TypeSpec, ValueSpec,
};

pub(crate) struct UnitBuilder<'a> {
    source: &'a str,
}

impl<'a> UnitBuilder<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub(crate) fn build(
        &self,
        path: &Path,
        fingerprint: u64,
        tree: &tree_sitter::Tree,
    ) -> Result<SourceUnit> {
        let root = tree.root_node();
        if root.has_error() {
            return Err(AnnogenError::parse(path, describe_error(&root)));
        }

        let top = children(&root);
        let mut package = None;
        let mut import_decls = Vec::new();
        let mut decls = Vec::new();

        for (i, node) in top.iter().enumerate() {
            match node.kind() {
                "package_clause" => {
                    package = first_child_of_kind(node, "package_identifier")
                        .map(|id| (self.text(&id).to_string(), Span::of(&id)));
                }
                "import_declaration" => import_decls.push(self.import_decl(node)),
                "function_declaration" | "method_declaration" => {
                    decls.push(Decl::Func(self.func_decl(node, leading_group(self, &top, i))));
                }
                "type_declaration" | "var_declaration" | "const_declaration" => {
                    decls.push(Decl::Gen(self.gen_decl(node, &top, i)));
                }
                _ => {}
            }
        }

        let (package, package_span) = package
            .ok_or_else(|| AnnogenError::parse(path, "missing package clause"))?;

        Ok(SourceUnit::new(
            path.to_path_buf(),
            self.source.to_string(),
            fingerprint,
            package,
            package_span,
            self.imports(&root),
            import_decls,
            decls,
        ))
    }

    fn text(&self, node: &Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn imports(&self, root: &Node) -> Imports {
        let Some(query) = grammar::imports_query() else {
            tracing::warn!("Invalid Go imports query");
            return Imports::default();
        };

        let mut imports = Vec::new();
        let mut cursor = tree_sitter::QueryCursor::new();
        let mut matches = cursor.matches(query, *root, self.source.as_bytes());

        while let Some(m) = matches.next() {
            let mut name = None;
            let mut path = None;
            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "import_name" => name = Some(self.text(&capture.node).to_string()),
                    "import_path" => path = Some(unquote(self.text(&capture.node))),
                    _ => {}
                }
            }
            if let Some(path) = path {
                imports.push(Import { name, path });
            }
        }

        Imports::new(imports)
    }

    fn import_decl(&self, node: &Node) -> ImportDecl {
        let list = first_child_of_kind(node, "import_spec_list");
        let container = list.unwrap_or(*node);
        let specs = children(&container)
            .iter()
            .filter(|c| c.kind() == "import_spec")
            .map(|spec| {
                let path = spec
                    .child_by_field_name("path")
                    .map(|p| unquote(self.text(&p)))
                    .unwrap_or_default();
                (Span::of(spec), path)
            })
            .collect();

        ImportDecl {
            span: Span::of(node),
            close: list
                .and_then(|l| first_child_of_kind(&l, ")"))
                .map(|paren| paren.start_byte()),
            specs,
        }
    }

    fn func_decl(&self, node: &Node, doc: Option<CommentGroup>) -> FuncDecl {
        let name = node.child_by_field_name("name");
        let params = node.child_by_field_name("parameters");
        let result = node.child_by_field_name("result");

        let signature = match params {
            Some(p) => {
                let end = result.map_or(p.end_byte(), |r| r.end_byte());
                self.source.get(p.start_byte()..end).unwrap_or("").to_string()
            }
            None => String::new(),
        };

        FuncDecl {
            name: name.map(|n| self.text(&n).to_string()).unwrap_or_default(),
            name_span: name.map(|n| Span::of(&n)).unwrap_or_default(),
            receiver: node
                .child_by_field_name("receiver")
                .map(|r| self.text(&r).to_string()),
            signature,
            span: Span::of(node),
            doc,
        }
    }

    fn gen_decl(&self, node: &Node, top: &[Node], index: usize) -> GenDecl {
        let token = match node.kind() {
            "type_declaration" => GenToken::Type,
            "var_declaration" => GenToken::Var,
            _ => GenToken::Const,
        };

        // specs sit directly under the declaration or inside a `*_spec_list`
        let container = children(node)
            .into_iter()
            .find(|c| c.kind().ends_with("_spec_list"))
            .unwrap_or(*node);
        let grouped = children(&container).iter().any(|c| c.kind() == "(");
        let siblings = children(&container);

        let mut specs = Vec::new();
        for (i, child) in siblings.iter().enumerate() {
            let doc = leading_group(self, &siblings, i);
            let mut comment = trailing_group(self, &siblings, i);
            if comment.is_none() && !grouped {
                comment = trailing_group(self, top, index);
            }

            match child.kind() {
                "type_spec" | "type_alias" => {
                    if let Some(spec) = self.type_spec(child, doc, comment) {
                        specs.push(Spec::Type(spec));
                    }
                }
                "var_spec" | "const_spec" => {
                    specs.push(Spec::Value(self.value_spec(child, doc, comment)));
                }
                _ => {}
            }
        }

        GenDecl {
            token,
            span: Span::of(node),
            grouped,
            doc: leading_group(self, top, index),
            specs,
        }
    }

    fn type_spec(
        &self,
        node: &Node,
        doc: Option<CommentGroup>,
        comment: Option<CommentGroup>,
    ) -> Option<TypeSpec> {
        let name = node.child_by_field_name("name")?;
        let ty = node.child_by_field_name("type")?;
        Some(TypeSpec {
            name: self.text(&name).to_string(),
            name_span: Span::of(&name),
            alias: node.kind() == "type_alias",
            ty: self.type_expr(&ty),
            span: Span::of(node),
            doc,
            comment,
        })
    }

    fn value_spec(
        &self,
        node: &Node,
        doc: Option<CommentGroup>,
        comment: Option<CommentGroup>,
    ) -> ValueSpec {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .filter(|n| n.kind() == "identifier")
            .map(|n| self.text(&n).to_string())
            .collect();

        ValueSpec {
            names,
            ty: node.child_by_field_name("type").map(|t| self.type_expr(&t)),
            span: Span::of(node),
            doc,
            comment,
        }
    }

    pub(crate) fn type_expr(&self, node: &Node) -> TypeExpr {
        let kind = match node.kind() {
            "type_identifier" => TypeKind::Ident(self.text(node).to_string()),
            "qualified_type" => TypeKind::Qualified {
                package: node
                    .child_by_field_name("package")
                    .map(|n| self.text(&n).to_string())
                    .unwrap_or_default(),
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(&n).to_string())
                    .unwrap_or_default(),
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeKind::Pointer(Box::new(self.type_expr(&inner))),
                None => TypeKind::Other(node.kind().to_string()),
            },
            "struct_type" => {
                let fields = first_child_of_kind(node, "field_declaration_list")
                    .map(|list| self.struct_fields(&list))
                    .unwrap_or_default();
                TypeKind::Struct(fields)
            }
            "interface_type" => TypeKind::Interface(self.interface_elems(node)),
            "map_type" => TypeKind::Map,
            "array_type" | "slice_type" => TypeKind::Array,
            "function_type" => TypeKind::Func,
            other => TypeKind::Other(other.to_string()),
        };

        TypeExpr {
            span: Span::of(node),
            text: self.text(node).to_string(),
            kind,
        }
    }

    fn struct_fields(&self, list: &Node) -> Vec<Field> {
        let siblings = children(list);
        let mut fields = Vec::new();

        for (i, node) in siblings.iter().enumerate() {
            if node.kind() != "field_declaration" {
                continue;
            }
            let Some(ty_node) = node.child_by_field_name("type") else {
                continue;
            };

            let mut cursor = node.walk();
            let names: Vec<String> = node
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(&n).to_string())
                .collect();

            let mut ty = self.type_expr(&ty_node);
            // embedded `*T` keeps the star outside the type field
            if names.is_empty() {
                if let Some(star) = first_child_of_kind(node, "*") {
                    let span = Span::new(star.start_byte(), ty_node.end_byte());
                    ty = TypeExpr {
                        span,
                        text: self.source.get(span.start..span.end).unwrap_or("").to_string(),
                        kind: TypeKind::Pointer(Box::new(ty)),
                    };
                }
            }

            fields.push(Field {
                names,
                ty,
                tag: node
                    .child_by_field_name("tag")
                    .map(|t| self.text(&t).to_string()),
                span: Span::of(node),
                doc: leading_group(self, &siblings, i),
                comment: trailing_group(self, &siblings, i),
            });
        }

        fields
    }

    fn interface_elems(&self, node: &Node) -> Vec<Field> {
        let siblings = children(node);
        let mut elems = Vec::new();

        for (i, child) in siblings.iter().enumerate() {
            let (names, ty) = match child.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let span = Span::new(name.end_byte(), child.end_byte());
                    let ty = TypeExpr {
                        span,
                        text: self
                            .source
                            .get(span.start..span.end)
                            .unwrap_or("")
                            .trim()
                            .to_string(),
                        kind: TypeKind::Func,
                    };
                    (vec![self.text(&name).to_string()], ty)
                }
                "type_elem" | "constraint_elem" | "interface_type_name" => {
                    let ty = match child.named_child(0) {
                        Some(inner) if child.named_child_count() == 1 => self.type_expr(&inner),
                        _ => self.type_expr(child),
                    };
                    (Vec::new(), ty)
                }
                _ => continue,
            };

            elems.push(Field {
                names,
                ty,
                tag: None,
                span: Span::of(child),
                doc: leading_group(self, &siblings, i),
                comment: trailing_group(self, &siblings, i),
            });
        }

        elems
    }
}

fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn first_child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// Comment group ending on the line right above `siblings[index]`.
fn leading_group(builder: &UnitBuilder, siblings: &[Node], index: usize) -> Option<CommentGroup> {
    let mut expected_row = siblings[index].start_position().row;
    let mut collected: Vec<Node> = Vec::new();

    let mut j = index;
    while j > 0 {
        j -= 1;
        let node = siblings[j];
        if node.kind() != "comment" || node.end_position().row + 1 < expected_row {
            break;
        }
        // a comment sharing a line with the previous node belongs to that node
        if j > 0 {
            let prev = siblings[j - 1];
            if prev.kind() != "comment" && prev.end_position().row == node.start_position().row {
                break;
            }
        }
        expected_row = node.start_position().row;
        collected.push(node);
    }

    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    Some(group_of(builder, &collected))
}

/// Comments starting on the same line `siblings[index]` ends on.
fn trailing_group(builder: &UnitBuilder, siblings: &[Node], index: usize) -> Option<CommentGroup> {
    let row = siblings[index].end_position().row;
    let collected: Vec<Node> = siblings[index + 1..]
        .iter()
        .take_while(|n| n.kind() == "comment" && n.start_position().row == row)
        .copied()
        .collect();

    if collected.is_empty() {
        return None;
    }
    Some(group_of(builder, &collected))
}

fn group_of(builder: &UnitBuilder, comments: &[Node]) -> CommentGroup {
    let first = comments[0];
    let last = comments[comments.len() - 1];
    CommentGroup {
        span: Span::new(first.start_byte(), last.end_byte()),
        comments: comments.iter().map(|c| builder.text(c).to_string()).collect(),
    }
}

fn unquote(literal: &str) -> String {
    literal.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Location and kind of the first syntax error below `node`
pub(crate) fn describe_error(node: &Node) -> String {
    let mut current = *node;
    'descend: loop {
        if current.is_error() || current.is_missing() {
            break;
        }
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            if child.has_error() {
                current = child;
                continue 'descend;
            }
        }
        break;
    }

    let pos = current.start_position();
    if current.is_missing() {
        format!("{}:{}: missing {}", pos.row + 1, pos.column + 1, current.kind())
    } else {
        format!("{}:{}: syntax error", pos.row + 1, pos.column + 1)
    }
}

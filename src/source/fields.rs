//! Helpers over struct and interface members.

use super::unit::{is_exported, Field, TypeExpr, TypeKind};

/// Name and signature of an interface method element
pub fn assert_func_type(field: &Field) -> Option<(&str, &TypeExpr)> {
    match (&field.ty.kind, field.names.first()) {
        (TypeKind::Func, Some(name)) => Some((name.as_str(), &field.ty)),
        _ => None,
    }
}

/// Type name an embedded field is promoted under: `T`, `*T`, `pkg.T`, `*pkg.T`
pub fn extract_anonymous_name(ty: &TypeExpr) -> Option<&str> {
    match &ty.kind {
        TypeKind::Ident(name) => Some(name),
        TypeKind::Qualified { name, .. } => Some(name),
        TypeKind::Pointer(inner) => extract_anonymous_name(inner),
        _ => None,
    }
}

/// Exported field names in declaration order.
///
/// Embedded fields contribute their type name. Names are not de-duplicated:
/// an embedded `Base` next to a named `Base` yields both.
pub fn extract_struct_field_names(fields: &[Field]) -> Vec<String> {
    let mut names = Vec::new();
    for field in fields {
        if field.names.is_empty() {
            if let Some(name) = extract_anonymous_name(&field.ty).filter(|n| is_exported(n)) {
                names.push(name.to_string());
            }
            continue;
        }
        names.extend(field.names.iter().filter(|n| is_exported(n)).cloned());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Caches;
    use crate::source::Parser;
    use std::path::Path;
    use std::sync::Arc;

    fn fields_of(source: &str, name: &str) -> Vec<Field> {
        let parser = Parser::new(Arc::new(Caches::new()));
        let unit = parser.parse_source(Path::new("t.go"), source).unwrap();
        match &unit.lookup_type(name).unwrap().ty.kind {
            TypeKind::Struct(fields) | TypeKind::Interface(fields) => fields.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extract_struct_field_names() {
        let fields = fields_of(
            "package t\ntype S struct{F1 string;F2 int;F3 bool;int;pkg.F4;*pkg.F5; f6 int}\n",
            "S",
        );
        assert_eq!(
            extract_struct_field_names(&fields),
            vec!["F1", "F2", "F3", "F4", "F5"]
        );
    }

    #[test]
    fn test_extract_struct_field_names_keeps_duplicates() {
        let fields = fields_of("package t\ntype S struct{\n\tBase\n\tBase int\n}\n", "S");
        assert_eq!(extract_struct_field_names(&fields), vec!["Base", "Base"]);
    }

    #[test]
    fn test_assert_func_type() {
        let fields = fields_of(
            "package t\ntype I interface{\n\tDo(x int) error\n\tio.Reader\n}\n",
            "I",
        );
        let (name, ty) = assert_func_type(&fields[0]).unwrap();
        assert_eq!(name, "Do");
        assert_eq!(ty.text, "(x int) error");
        assert!(assert_func_type(&fields[1]).is_none());
    }
}

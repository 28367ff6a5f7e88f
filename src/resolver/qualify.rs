use std::path::Path;

use crate::source::{default_import_name, is_exported, Imports};

use super::module::ModuleResolver;

/// Rewrites a type name written in package `src_import_path` so it refers to
/// the same type from package `dst_import_path`.
///
/// Unqualified exported names gain a qualifier imported into `dst_imports`.
/// Qualified names are resolved through `src_imports` and either lose their
/// qualifier (same package as the destination) or are re-qualified against
/// `dst_imports`. Unexported names and unknown qualifiers pass through. A
/// leading `*` is kept.
///
/// Package names are assumed from import paths; use
/// [`ModuleResolver::fix_package`] to read them from the packages instead.
pub fn fix_package(
    name: &str,
    src_import_path: &str,
    dst_import_path: &str,
    src_imports: &Imports,
    dst_imports: &mut Imports,
) -> String {
    fix_package_with(
        name,
        src_import_path,
        dst_import_path,
        src_imports,
        dst_imports,
        |_| None,
    )
}

impl ModuleResolver {
    /// [`fix_package`] with package names resolved from `dir`.
    pub fn fix_package(
        &self,
        name: &str,
        src_import_path: &str,
        dst_import_path: &str,
        src_imports: &Imports,
        dst_imports: &mut Imports,
        dir: &Path,
    ) -> String {
        fix_package_with(
            name,
            src_import_path,
            dst_import_path,
            src_imports,
            dst_imports,
            |path| self.package_name(path, dir),
        )
    }
}

fn fix_package_with<F>(
    name: &str,
    src_import_path: &str,
    dst_import_path: &str,
    src_imports: &Imports,
    dst_imports: &mut Imports,
    package_name: F,
) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let (ptr, name) = match name.strip_prefix('*') {
        Some(rest) => ("*", rest),
        None => ("", name),
    };
    let mut local_name = |path: &str| {
        let declared = package_name(path).unwrap_or_else(|| default_import_name(path));
        dst_imports.add_named(path, &declared)
    };

    let Some((qualifier, ident)) = name.split_once('.') else {
        if is_exported(name) && src_import_path != dst_import_path {
            return format!("{}{}.{}", ptr, local_name(src_import_path), name);
        }
        return format!("{}{}", ptr, name);
    };

    match src_imports.which_by(qualifier, |i| package_name(&i.path)) {
        Some(path) if path == dst_import_path => format!("{}{}", ptr, ident),
        Some(path) => format!("{}{}.{}", ptr, local_name(path), ident),
        None => format!("{}{}", ptr, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Import;

    const SRC: &str = "example.com/app/model";
    const DST: &str = "example.com/app/api";

    fn src_imports() -> Imports {
        Imports::new(vec![
            Import::new("time"),
            Import::aliased("a", "example.com/app/api"),
            Import::aliased("ext", "host.com/time"),
        ])
    }

    #[test]
    fn test_exported_name_gets_qualified() {
        let mut dst = Imports::default();
        assert_eq!(fix_package("User", SRC, DST, &src_imports(), &mut dst), "model.User");
        assert_eq!(fix_package("*User", SRC, DST, &src_imports(), &mut dst), "*model.User");
        assert_eq!(dst.len(), 1);
    }

    #[test]
    fn test_same_package_unchanged() {
        let mut dst = Imports::default();
        assert_eq!(fix_package("User", DST, DST, &src_imports(), &mut dst), "User");
        assert!(dst.is_empty());
    }

    #[test]
    fn test_unexported_passes_through() {
        let mut dst = Imports::default();
        assert_eq!(fix_package("user", SRC, DST, &src_imports(), &mut dst), "user");
        assert_eq!(fix_package("*int", SRC, DST, &src_imports(), &mut dst), "*int");
        assert!(dst.is_empty());
    }

    #[test]
    fn test_qualified_into_destination_package() {
        let mut dst = Imports::default();
        assert_eq!(fix_package("*a.Handler", SRC, DST, &src_imports(), &mut dst), "*Handler");
        assert!(dst.is_empty());
    }

    #[test]
    fn test_qualified_requalified_reuses_alias() {
        let mut dst = Imports::new(vec![Import::new("time")]);
        assert_eq!(fix_package("time.Time", SRC, DST, &src_imports(), &mut dst), "time.Time");
        assert_eq!(fix_package("ext.Clock", SRC, DST, &src_imports(), &mut dst), "time2.Clock");
        assert_eq!(fix_package("ext.Zone", SRC, DST, &src_imports(), &mut dst), "time2.Zone");
        assert_eq!(dst.len(), 2);
    }

    #[test]
    fn test_versioned_and_prefixed_paths() {
        let src = Imports::new(vec![
            Import::new("gopkg.in/yaml.v3"),
            Import::new("github.com/mattn/go-sqlite3"),
        ]);
        let mut dst = Imports::default();
        assert_eq!(fix_package("yaml.Node", SRC, DST, &src, &mut dst), "yaml.Node");
        assert_eq!(fix_package("*sqlite3.Conn", SRC, DST, &src, &mut dst), "*sqlite3.Conn");
        assert_eq!(
            dst.render(),
            "import (\n\tsqlite3 \"github.com/mattn/go-sqlite3\"\n\tyaml \"gopkg.in/yaml.v3\"\n)"
        );
    }

    #[test]
    fn test_unknown_qualifier_passes_through() {
        let mut dst = Imports::default();
        assert_eq!(fix_package("zz.Thing", SRC, DST, &src_imports(), &mut dst), "zz.Thing");
        assert!(dst.is_empty());
    }
}

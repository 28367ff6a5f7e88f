use std::path::Path;
use std::sync::Arc;

use crate::source::{Object, SourceUnit, TypeExpr, TypeKind};

use super::module::{package_files, ModuleResolver};

/// Longest alias chain followed before giving up
pub const MAX_LOOKUP_DEPTH: usize = 32;

impl ModuleResolver {
    /// Definition of type `name` in package `import_path`, following aliases
    /// and references into other packages until a concrete type is reached.
    ///
    /// `dir` is the directory the package path is resolved from. Returns the
    /// concrete type expression and the unit that declares it.
    pub fn lookup_type_spec(
        &self,
        name: &str,
        dir: &Path,
        import_path: &str,
    ) -> Option<(TypeExpr, Arc<SourceUnit>)> {
        self.lookup_at_depth(name, dir, import_path, 0)
    }

    fn lookup_at_depth(
        &self,
        name: &str,
        dir: &Path,
        import_path: &str,
        depth: usize,
    ) -> Option<(TypeExpr, Arc<SourceUnit>)> {
        if import_path.is_empty() {
            return None;
        }
        if depth >= MAX_LOOKUP_DEPTH {
            tracing::warn!(
                "giving up on {}.{} after {} references",
                import_path,
                name,
                depth
            );
            return None;
        }

        let pkg_dir = self.package_import_dir(import_path, dir)?;
        for file in package_files(Path::new(&pkg_dir)) {
            let unit = match self.parser().parse_file(&file) {
                Ok(unit) => unit,
                Err(e) => {
                    tracing::debug!("skipping {}: {}", file.display(), e);
                    continue;
                }
            };

            // the first declaration of the name ends the search, whatever it is
            let spec = match unit.lookup(name) {
                None => continue,
                Some(Object::Type(spec)) => spec,
                Some(_) => return None,
            };

            if spec.ty.is_concrete() {
                return Some((spec.ty.clone(), Arc::clone(&unit)));
            }
            return match &spec.ty.kind {
                TypeKind::Qualified { package, name } => {
                    let target = unit
                        .imports
                        .which_by(package, |i| self.package_name(&i.path, unit.dir()))?
                        .to_string();
                    self.lookup_at_depth(name, dir, &target, depth + 1)
                }
                TypeKind::Ident(ident) => {
                    self.lookup_at_depth(ident, dir, import_path, depth + 1)
                }
                _ => None,
            };
        }
        None
    }
}

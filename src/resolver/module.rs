use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::Caches;
use crate::source::{absolute, default_import_name, Parser};

use super::toolchain::Toolchain;

pub const MOD_FILENAME: &str = "go.mod";

static MODULE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*module\s+"?([^\s"/][^\s"]*)"?\s*(?://.*)?$"#).unwrap());

/// Import identity and package location queries, memoized in [`Caches`].
///
/// Paths inside a local module are answered from its `go.mod`; anything else
/// is delegated to the [`Toolchain`]. Unresolvable queries yield `None`.
pub struct ModuleResolver {
    parser: Arc<Parser>,
    toolchain: Arc<dyn Toolchain>,
}

impl ModuleResolver {
    pub fn new(parser: Arc<Parser>, toolchain: Arc<dyn Toolchain>) -> Self {
        Self { parser, toolchain }
    }

    pub fn parser(&self) -> &Arc<Parser> {
        &self.parser
    }

    fn caches(&self) -> &Caches {
        self.parser.caches()
    }

    /// `go.mod` governing `dir`: the nearest one in `dir` or its ancestors
    pub fn mod_file(&self, dir: &Path) -> Option<PathBuf> {
        let dir = absolute(dir).ok()?;
        let key = dir.to_string_lossy();
        self.caches()
            .modules
            .mod_file
            .load_with(&key, || {
                dir.ancestors()
                    .map(|d| d.join(MOD_FILENAME))
                    .find(|m| m.is_file())
                    .map(|m| m.to_string_lossy().into_owned())
            })
            .map(PathBuf::from)
    }

    /// Module path declared by a `go.mod` file
    pub fn module_name(&self, mod_file: &Path) -> Option<String> {
        let content = match std::fs::read_to_string(mod_file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("cannot read {}: {}", mod_file.display(), e);
                return None;
            }
        };
        MODULE_DIRECTIVE
            .captures(&content)
            .map(|caps| caps[1].to_string())
    }

    /// Import path of a file or directory. Paths that do not exist yet are
    /// placed relative to the module of their nearest existing ancestor.
    pub fn import_path(&self, path: &Path) -> Option<String> {
        let dir = package_dir_of(path)?;
        let key = dir.to_string_lossy();
        self.caches().modules.import_path.load_with(&key, || {
            let existing = dir.ancestors().find(|d| d.exists())?;
            let mod_file = self.mod_file(existing)?;
            let mod_dir = mod_file.parent()?;
            let module = self.module_name(&mod_file)?;

            let rel = dir.strip_prefix(mod_dir).ok()?;
            let mut import_path = module;
            for component in rel.components() {
                import_path.push('/');
                import_path.push_str(&component.as_os_str().to_string_lossy());
            }
            Some(import_path)
        })
    }

    /// Package name of a file or directory.
    ///
    /// Taken from the package clause of the directory's sources, else from the
    /// import path, else from the directory name.
    pub fn import_name(&self, path: &Path) -> Option<String> {
        let dir = package_dir_of(path)?;
        let key = dir.to_string_lossy();
        self.caches().modules.import_name.load_with(&key, || {
            if let Some(name) = self.package_clause(&dir) {
                return Some(name);
            }
            if let Some(import_path) = self.import_path(&dir) {
                return Some(default_import_name(&import_path));
            }
            dir.file_name()
                .map(|n| default_import_name(&n.to_string_lossy()))
        })
    }

    /// Source directory of package `pkg` as seen from `dir`
    pub fn package_import_dir(&self, pkg: &str, dir: &Path) -> Option<String> {
        let key = format!("{}#{}", pkg, dir.display());
        self.caches().modules.package_dir.load_with(&key, || {
            if let Some(local) = self.local_package_dir(pkg, dir) {
                return Some(local.to_string_lossy().into_owned());
            }
            self.toolchain
                .package_dir(pkg, dir)
                .map_err(|e| tracing::warn!("{}", e))
                .ok()
        })
    }

    /// Declared name of package `pkg` as seen from `dir`
    pub fn package_import_name(&self, pkg: &str, dir: &Path) -> Option<String> {
        let key = format!("{}#{}", pkg, dir.display());
        self.caches().modules.package_name.load_with(&key, || {
            if let Some(pkg_dir) = self.package_import_dir(pkg, dir) {
                if let Some(name) = self.package_clause(Path::new(&pkg_dir)) {
                    return Some(name);
                }
            }
            self.toolchain
                .package_name(pkg, dir)
                .map_err(|e| tracing::warn!("{}", e))
                .ok()
        })
    }

    /// Declared name of package `import_path` when it can be read, else `None`.
    ///
    /// Standard library packages are never resolved; their names follow
    /// their import paths.
    pub fn package_name(&self, import_path: &str, dir: &Path) -> Option<String> {
        if is_standard_import_path(import_path) {
            return None;
        }
        self.package_import_name(import_path, dir)
    }

    /// Directory of `pkg` when it belongs to the module governing `dir`
    fn local_package_dir(&self, pkg: &str, dir: &Path) -> Option<PathBuf> {
        let mod_file = self.mod_file(dir)?;
        let module = self.module_name(&mod_file)?;
        let mod_dir = mod_file.parent()?;

        let candidate = if pkg == module {
            mod_dir.to_path_buf()
        } else {
            let rest = pkg.strip_prefix(&module)?.strip_prefix('/')?;
            rest.split('/').fold(mod_dir.to_path_buf(), |p, s| p.join(s))
        };
        candidate.is_dir().then_some(candidate)
    }

    /// Package clause of the first parsable non-test source in `dir`
    fn package_clause(&self, dir: &Path) -> Option<String> {
        package_files(dir).into_iter().find_map(|file| {
            match self.parser.parse_file(&file) {
                Ok(unit) if !unit.package.is_empty() => Some(unit.package.clone()),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!("skipping {}: {}", file.display(), e);
                    None
                }
            }
        })
    }
}

/// Standard library paths have no dot in their first element.
pub fn is_standard_import_path(path: &str) -> bool {
    let first = path.split('/').next().unwrap_or(path);
    !first.contains('.')
}

/// Non-test Go sources directly in `dir`, sorted by name
pub fn package_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".go") && !n.ends_with("_test.go"))
        })
        .collect();
    files.sort();
    files
}

/// A directory stands for itself; a `.go` path stands for its directory.
fn package_dir_of(path: &Path) -> Option<PathBuf> {
    let path = absolute(path).ok()?;
    let is_source = path.extension().is_some_and(|e| e == "go") && !path.is_dir();
    if is_source {
        path.parent().map(Path::to_path_buf)
    } else {
        Some(path)
    }
}

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

/// One import spec. `name` is the explicit alias, if written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Import {
    pub name: Option<String>,
    pub path: String,
}

impl Import {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    pub fn aliased(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }

    /// Identifier the imported package is assumed to bind in the file.
    /// Unaliased imports use [`default_import_name`].
    pub fn local_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => default_import_name(&self.path),
        }
    }

    /// The spec as written inside an import block: `name "path"` or `"path"`
    pub fn render(&self) -> String {
        match &self.name {
            Some(name) => format!("{} \"{}\"", name, self.path),
            None => format!("\"{}\"", self.path),
        }
    }
}

/// Import list of a file, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Imports(Vec<Import>);

impl Imports {
    pub fn new(imports: Vec<Import>) -> Self {
        Self(imports)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Import> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn find(&self, path: &str) -> Option<&Import> {
        self.0.iter().find(|i| i.path == path)
    }

    /// Import path bound to a local package name. Blank and dot imports never match.
    ///
    /// Unaliased imports match by their assumed name only; see [`Imports::which_by`].
    pub fn which(&self, name: &str) -> Option<&str> {
        self.which_by(name, |_| None)
    }

    /// Like [`Imports::which`], then retries unaliased imports with the real
    /// package name reported by `package_name`.
    pub fn which_by<F>(&self, name: &str, package_name: F) -> Option<&str>
    where
        F: Fn(&Import) -> Option<String>,
    {
        if name.is_empty() || name == "_" || name == "." {
            return None;
        }
        let visible = || self.0.iter().filter(|i| !is_hidden(i));

        if let Some(found) = visible().find(|i| i.local_name() == name) {
            return Some(found.path.as_str());
        }
        visible()
            .filter(|i| i.name.is_none())
            .find(|i| package_name(*i).as_deref() == Some(name))
            .map(|i| i.path.as_str())
    }

    /// Adds `path` assuming its package name is [`default_import_name`].
    pub fn add(&mut self, path: &str) -> String {
        self.add_named(path, &default_import_name(path))
    }

    /// Adds `path`, whose package clause declares `package_name`, unless it is
    /// already imported, and returns the local name to refer to it by.
    ///
    /// A name colliding with an existing local name gets a numbered alias
    /// (`time2`, `time3`, ...). Any local name other than the last path
    /// element is written as an explicit alias.
    pub fn add_named(&mut self, path: &str, package_name: &str) -> String {
        // a blank or dot import of the same path cannot be referred to by name
        if let Some(existing) = self.0.iter().find(|i| i.path == path && !is_hidden(i)) {
            return existing
                .name
                .clone()
                .unwrap_or_else(|| package_name.to_string());
        }

        let taken: HashSet<String> = self
            .0
            .iter()
            .filter(|i| !is_hidden(i))
            .map(Import::local_name)
            .collect();

        let mut local = package_name.to_string();
        let mut n = 2;
        while taken.contains(&local) {
            local = format!("{}{}", package_name, n);
            n += 1;
        }

        let last = path.rsplit('/').next().unwrap_or(path);
        if local == last {
            self.0.push(Import::new(path));
        } else {
            self.0.push(Import::aliased(local.clone(), path));
        }
        local
    }

    /// Imports present here but not in `base`, sorted by path
    pub fn added_since(&self, base: &Imports) -> Vec<&Import> {
        let mut added: Vec<&Import> = self.0.iter().filter(|i| !base.0.contains(i)).collect();
        added.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
        added.dedup();
        added
    }

    /// Canonical import declaration: one parenthesized block sorted by path.
    pub fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }

        let mut sorted: Vec<&Import> = self.0.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
        sorted.dedup();

        let mut out = String::from("import (\n");
        for import in sorted {
            let _ = writeln!(out, "\t{}", import.render());
        }
        out.push(')');
        out
    }
}

impl<'a> IntoIterator for &'a Imports {
    type Item = &'a Import;
    type IntoIter = std::slice::Iter<'a, Import>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn is_hidden(import: &Import) -> bool {
    matches!(import.name.as_deref(), Some("_") | Some("."))
}

/// Package name an import path is assumed to declare: the last element
/// (the one before a `/vN` major-version suffix), without a `go-` prefix,
/// cut at the first character that cannot appear in an identifier.
///
/// `gopkg.in/yaml.v3` gives `yaml`, `github.com/mattn/go-sqlite3` gives `sqlite3`.
pub fn default_import_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let end = last
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(last.len());
    last[..end].to_string()
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_import_name() {
        assert_eq!(default_import_name("time"), "time");
        assert_eq!(default_import_name("net/http"), "http");
        assert_eq!(default_import_name("github.com/go-chi/chi/v5"), "chi");
        assert_eq!(default_import_name("example.com/go-kit"), "kit");
        assert_eq!(default_import_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(default_import_name("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(default_import_name("example.com/foo-bar"), "foo");
    }

    #[test]
    fn test_add_aliases_when_name_differs_from_path() {
        let mut imports = Imports::default();
        assert_eq!(imports.add("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(imports.add("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(imports.add_named("example.com/app/internal/store", "storage"), "storage");
        assert_eq!(
            imports.render(),
            "import (\n\tstorage \"example.com/app/internal/store\"\n\tsqlite3 \"github.com/mattn/go-sqlite3\"\n\tyaml \"gopkg.in/yaml.v3\"\n)"
        );
        assert_eq!(imports.which("yaml"), Some("gopkg.in/yaml.v3"));
        assert_eq!(imports.which("storage"), Some("example.com/app/internal/store"));
    }

    #[test]
    fn test_add_named_existing_unaliased_import() {
        let mut imports = Imports::new(vec![Import::new("example.com/app/internal/store")]);
        assert_eq!(imports.add_named("example.com/app/internal/store", "storage"), "storage");
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_which_by_real_package_name() {
        let imports = Imports::new(vec![
            Import::new("time"),
            Import::new("example.com/app/internal/store"),
        ]);
        assert_eq!(imports.which("storage"), None);
        let real = |i: &Import| {
            (i.path == "example.com/app/internal/store").then(|| "storage".to_string())
        };
        assert_eq!(
            imports.which_by("storage", real),
            Some("example.com/app/internal/store")
        );
        assert_eq!(imports.which_by("time", real), Some("time"));
    }

    #[test]
    fn test_which_assumed_name_for_versioned_paths() {
        let imports = Imports::new(vec![Import::new("gopkg.in/yaml.v3")]);
        assert_eq!(imports.which("yaml"), Some("gopkg.in/yaml.v3"));
    }

    #[test]
    fn test_add_deduplicates_by_path() {
        let mut imports = Imports::new(vec![Import::new("time")]);
        assert_eq!(imports.add("time"), "time");
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_add_returns_existing_alias() {
        let mut imports = Imports::new(vec![Import::aliased("stdctx", "context")]);
        assert_eq!(imports.add("context"), "stdctx");
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_add_aliases_on_conflict() {
        let mut imports = Imports::new(vec![Import::new("time")]);
        assert_eq!(imports.add("host.com/time"), "time2");
        assert_eq!(imports.add("other.com/time"), "time3");
        assert_eq!(imports.which("time2"), Some("host.com/time"));
    }

    #[test]
    fn test_which_ignores_blank_imports() {
        let imports = Imports::new(vec![
            Import::aliased("_", "embed"),
            Import::new("strings"),
        ]);
        assert_eq!(imports.which("_"), None);
        assert_eq!(imports.which("embed"), None);
        assert_eq!(imports.which("strings"), Some("strings"));
    }

    #[test]
    fn test_render_sorted_by_path() {
        let mut imports = Imports::new(vec![Import::new("time")]);
        imports.add("context");
        imports.add("host.com/time");
        assert_eq!(
            imports.render(),
            "import (\n\t\"context\"\n\ttime2 \"host.com/time\"\n\t\"time\"\n)"
        );
    }

    #[test]
    fn test_added_since() {
        let base = Imports::new(vec![Import::new("os"), Import::new("fmt")]);
        let mut imports = base.clone();
        imports.add("time");
        imports.add("context");
        imports.add("fmt");

        let added: Vec<&str> = imports
            .added_since(&base)
            .iter()
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(added, vec!["context", "time"]);
        assert!(base.added_since(&imports).is_empty());
    }
}

//! Optional `annogen.toml` in the working directory.
//!
//! ```toml
//! prefix = "+gen:"
//! cache-file = ".annogencache"
//! skip-dirs = ["generated"]
//! offline = false
//!
//! [plugins.dump]
//! compact = ""
//! ```
//!
//! Command-line flags take precedence over every value here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::snapshot::CACHE_FILENAME;
use crate::error::{AnnogenError, Result};

pub const CONFIG_FILENAME: &str = "annogen.toml";

/// Annotation prefix used when neither the command line nor the config sets one
pub const DEFAULT_PREFIX: &str = "+gen:";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub prefix: Option<String>,
    pub cache_file: Option<PathBuf>,
    /// Directory names pruned on top of the builtin skip list
    pub skip_dirs: Vec<String>,
    /// Never shell out to the Go toolchain
    pub offline: bool,
    /// Extension options per plugin name
    pub plugins: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Reads `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content)
            .map_err(|e| AnnogenError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `annogen.toml` in `dir`
    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(CONFIG_FILENAME))
    }

    pub fn prefix(&self, flag: Option<&str>) -> String {
        flag.or(self.prefix.as_deref())
            .unwrap_or(DEFAULT_PREFIX)
            .to_string()
    }

    pub fn cache_file(&self, flag: Option<&Path>) -> PathBuf {
        flag.or(self.cache_file.as_deref())
            .unwrap_or_else(|| Path::new(CACHE_FILENAME))
            .to_path_buf()
    }

    /// Configured options for `plugin` overlaid by `flags`
    pub fn plugin_options(
        &self,
        plugin: &str,
        flags: BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut options = self.plugins.get(plugin).cloned().unwrap_or_default();
        options.extend(flags);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
prefix = "+zz:"
cache-file = "/tmp/cache.json"
skip-dirs = ["generated", "third_party"]
offline = true

[plugins.dump]
compact = ""
"#,
        )
        .unwrap();

        assert_eq!(config.prefix(None), "+zz:");
        assert_eq!(config.cache_file(None), PathBuf::from("/tmp/cache.json"));
        assert_eq!(config.skip_dirs, vec!["generated", "third_party"]);
        assert!(config.offline);
        assert_eq!(config.plugins["dump"]["compact"], "");
    }

    #[test]
    fn test_flags_win() {
        let config = Config::parse("prefix = \"+zz:\"\n[plugins.p]\nk = \"file\"\nj = \"kept\"\n")
            .unwrap();
        assert_eq!(config.prefix(Some("+cli:")), "+cli:");

        let mut flags = BTreeMap::new();
        flags.insert("k".to_string(), "flag".to_string());
        let options = config.plugin_options("p", flags);
        assert_eq!(options["k"], "flag");
        assert_eq!(options["j"], "kept");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prefix(None), DEFAULT_PREFIX);
        assert_eq!(config.cache_file(None), PathBuf::from(CACHE_FILENAME));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "prefx = \"+a:\"\n").unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(AnnogenError::Config(_))
        ));
    }
}

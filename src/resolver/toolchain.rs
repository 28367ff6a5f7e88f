use std::path::Path;
use std::process::Command;

use crate::error::{AnnogenError, Result};

/// Package queries answered by the Go toolchain.
///
/// Only consulted for packages outside the module that contains the query
/// directory (standard library, dependencies).
pub trait Toolchain: Send + Sync {
    /// Source directory of package `pkg`, resolved from `dir`
    fn package_dir(&self, pkg: &str, dir: &Path) -> Result<String>;

    /// Declared name of package `pkg`, resolved from `dir`
    fn package_name(&self, pkg: &str, dir: &Path) -> Result<String>;
}

/// Runs `go list` in the query directory
pub struct GoToolchain {
    binary: String,
}

impl GoToolchain {
    pub fn new() -> Self {
        Self::with_binary("go")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn list(&self, format: &str, pkg: &str, dir: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(["list", "-f", format, pkg])
            .current_dir(dir)
            .output()
            .map_err(|e| AnnogenError::Resolve(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(AnnogenError::Resolve(format!(
                "{} list {} failed: {}",
                self.binary,
                pkg,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for GoToolchain {
    fn package_dir(&self, pkg: &str, dir: &Path) -> Result<String> {
        self.list("{{.Dir}}", pkg, dir)
    }

    fn package_name(&self, pkg: &str, dir: &Path) -> Result<String> {
        self.list("{{.Name}}", pkg, dir)
    }
}

/// Answers nothing; resolution stays within local modules.
pub struct Offline;

impl Toolchain for Offline {
    fn package_dir(&self, pkg: &str, _dir: &Path) -> Result<String> {
        Err(AnnogenError::Resolve(format!("offline: cannot locate {}", pkg)))
    }

    fn package_name(&self, pkg: &str, _dir: &Path) -> Result<String> {
        Err(AnnogenError::Resolve(format!("offline: cannot name {}", pkg)))
    }
}

//! Cross-module resolution: import identity of files and directories,
//! package location, type lookup across packages and qualified-name rewriting.

pub mod lookup;
pub mod module;
pub mod qualify;
pub mod toolchain;

pub use lookup::MAX_LOOKUP_DEPTH;
pub use module::{is_standard_import_path, package_files, ModuleResolver, MOD_FILENAME};
pub use qualify::fix_package;
pub use toolchain::{GoToolchain, Offline, Toolchain};

//! Run configuration shared by the CLI and the library entry points.

use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::debug;

/// Environment variable naming the standard library directory.
pub const STDLIB_ENV: &str = "NOXY_STDLIB";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory imports are resolved against first, normally the entry file's directory.
    pub base_path: PathBuf,
    /// Fallback directory for imports, holding `io.nx` and `strings.nx`.
    pub stdlib_path: Option<PathBuf>,
    /// Run the static checker before evaluating.
    pub type_check: bool,
}

impl Config {
    pub fn new(base_path: PathBuf) -> Self {
        Config {
            base_path,
            stdlib_path: discover_stdlib(),
            type_check: true,
        }
    }

    /// A configuration for running `entry`, importing relative to its directory.
    pub fn for_entry(entry: &Path) -> Self {
        let base_path = entry
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Config::new(base_path)
    }

    pub fn with_stdlib(mut self, stdlib_path: Option<PathBuf>) -> Self {
        if stdlib_path.is_some() {
            self.stdlib_path = stdlib_path;
        }
        self
    }

    pub fn with_type_check(mut self, type_check: bool) -> Self {
        self.type_check = type_check;
        self
    }
}

/// Finds the standard library: `NOXY_STDLIB`, then `stdlib/` next to the
/// executable, then the one shipped with the crate sources.
pub fn discover_stdlib() -> Option<PathBuf> {
    if let Some(path) = env::var_os(STDLIB_ENV) {
        debug!("Using stdlib from {}", STDLIB_ENV);
        return Some(PathBuf::from(path));
    }

    let beside_exe = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("stdlib")));
    if let Some(path) = beside_exe.filter(|path| path.is_dir()) {
        return Some(path);
    }

    let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("stdlib");
    bundled.is_dir().then_some(bundled)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::Config;

    #[test]
    fn test_base_path_is_entry_directory() {
        let config = Config::for_entry(Path::new("programs/main.nx"));
        assert_eq!(config.base_path, PathBuf::from("programs"));

        let config = Config::for_entry(Path::new("main.nx"));
        assert_eq!(config.base_path, PathBuf::from("."));
    }

    #[test]
    fn test_builders() {
        let config = Config::new(PathBuf::from("."))
            .with_stdlib(Some(PathBuf::from("/opt/noxy/stdlib")))
            .with_type_check(false);

        assert_eq!(config.stdlib_path, Some(PathBuf::from("/opt/noxy/stdlib")));
        assert!(!config.type_check);

        // `None` keeps the discovered location.
        let discovered = Config::new(PathBuf::from(".")).stdlib_path;
        assert_eq!(
            Config::new(PathBuf::from(".")).with_stdlib(None).stdlib_path,
            discovered
        );
    }
}

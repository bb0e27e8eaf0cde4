//! Where eco2 keeps its files

use std::path::PathBuf;

/// Name of the registry file inside ECO2_HOME
pub const REGISTRY_FILE: &str = "thermostats.xml";

#[derive(Debug, thiserror::Error)]
pub enum HomeError {
    #[error("could not determine home directory, set ECO2_HOME")]
    NoHomeDirectory,
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Get ECO2_HOME, defaulting to `~/.eco2`
///
/// The directory is not created here, see [`ensure_home`].
pub fn eco2_home() -> Result<PathBuf, HomeError> {
    if let Some(home) = std::env::var_os("ECO2_HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|home| home.join(".eco2"))
        .ok_or(HomeError::NoHomeDirectory)
}

/// Create `home` if it does not exist yet
pub fn ensure_home(home: &std::path::Path) -> Result<(), HomeError> {
    std::fs::create_dir_all(home).map_err(|source| HomeError::Create {
        path: home.to_path_buf(),
        source,
    })
}

/// Path of the registry file for the given home directory
pub fn registry_path(home: &std::path::Path) -> PathBuf {
    home.join(REGISTRY_FILE)
}

#[cfg(test)]
mod tests {
    #[test]
    fn registry_lives_in_home() {
        assert_eq!(
            super::registry_path(std::path::Path::new("/tmp/eco2")),
            std::path::PathBuf::from("/tmp/eco2/thermostats.xml")
        );
    }

    #[test]
    fn ensure_home_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("a").join("b");
        super::ensure_home(&home).unwrap();
        assert!(home.is_dir());
    }
}

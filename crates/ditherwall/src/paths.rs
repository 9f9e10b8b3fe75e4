use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "DITHERWALL_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "ditherwall";
const APPLICATION: &str = "ditherwall";
const CONFIG_FILE: &str = "config.toml";

/// Directory holding `config.toml`; `DITHERWALL_CONFIG_DIR` overrides the
/// platform location.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Ok(value);
    }
    let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .ok_or_else(|| anyhow!("failed to determine user directories"))?;
    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_file_in(&config_dir()?))
}

fn config_file_in(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    pub(crate) fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    pub(crate) struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        pub(crate) fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }

        pub(crate) fn clear(key: &'static str) -> Self {
            let previous = env::var_os(key);
            env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_override_takes_precedence() {
        let _lock = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        assert_eq!(config_dir().unwrap(), root.path());
        assert_eq!(default_config_path().unwrap(), root.path().join("config.toml"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let _lock = env_lock().lock().unwrap();
        let _guard = EnvGuard::set(ENV_CONFIG_DIR, Path::new(""));

        if let Ok(dir) = config_dir() {
            assert_ne!(dir, PathBuf::new());
        }
    }

    #[test]
    fn platform_dir_ends_with_application_name() {
        let _lock = env_lock().lock().unwrap();
        let _guard = EnvGuard::clear(ENV_CONFIG_DIR);

        // Headless CI may have no home directory at all.
        if let Ok(dir) = config_dir() {
            assert!(dir.to_string_lossy().contains(APPLICATION));
        }
    }
}

//! Test environment abstraction for isolated testing.
//!
//! Provides `TestEnvironment` to manage:
//! - An isolated home directory holding `.cfredir/config.toml`
//! - A fake local app-data tree for protected-root composition
//!
//! # Usage
//!
//! ```ignore
//! use cfredir_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new()?;
//! env.write_config("[redirect]\napp_dir = \"Acme\"\n")?;
//! let cfg = cfredir_config::Config::load_from(&env.config_path())?;
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with unique paths
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Stand-in for the user's home directory
    pub home: PathBuf,
    /// Stand-in for the local app-data special folder
    pub local_app_data: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let home = root.join(format!("home-{}", test_id));
        let local_app_data = home.join("AppData").join("Local");
        std::fs::create_dir_all(home.join(".cfredir"))?;
        std::fs::create_dir_all(&local_app_data)?;

        Ok(Self {
            _temp_dir: temp_dir,
            home,
            local_app_data,
            test_id,
        })
    }

    /// Path of the global config file inside this environment
    pub fn config_path(&self) -> PathBuf {
        self.home.join(".cfredir").join("config.toml")
    }

    /// Write the global config file
    pub fn write_config(&self, contents: &str) -> anyhow::Result<PathBuf> {
        let path = self.config_path();
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Protected root a given config would compose inside this environment.
    pub fn protected_root(&self, config: &crate::RedirectConfig) -> anyhow::Result<PathBuf> {
        let [app, user_data] = config.segments()?;
        Ok(self.local_app_data.join(app).join(user_data))
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.home.join(".cfredir").exists());
        assert!(env.local_app_data.exists());
    }

    #[test]
    fn test_environment_is_unique() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.test_id, env2.test_id);
        assert_ne!(env1.config_path(), env2.config_path());
    }

    #[test]
    fn test_protected_root_does_not_create_directories() {
        let env = TestEnvironment::new().unwrap();
        let root = env
            .protected_root(&crate::RedirectConfig::default())
            .unwrap();
        assert!(root.starts_with(&env.local_app_data));
        assert!(root.ends_with("Cfredir/User Data"));
        assert!(!root.exists());
    }
}

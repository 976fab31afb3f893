//! Runtime configuration

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::types::{Result, TrackerError};

/// Environment variable overriding the tracker directory
pub const TRACKER_DIR_ENV: &str = "TALLYTRACK_DIR";

/// Explicit configuration handed to the tracker store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    tracker_dir: PathBuf,
}

impl Config {
    /// Use `dir` when given, otherwise `~/.tallytrack/trackers`
    pub fn resolve(dir: Option<PathBuf>) -> Result<Self> {
        let tracker_dir = match dir {
            Some(dir) => dir,
            None => Self::default_tracker_dir()?,
        };
        Ok(Self { tracker_dir })
    }

    pub fn with_tracker_dir(tracker_dir: PathBuf) -> Self {
        Self { tracker_dir }
    }

    pub fn tracker_dir(&self) -> &Path {
        &self.tracker_dir
    }

    /// Create the tracker directory if missing
    pub fn ensure_tracker_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.tracker_dir)?;
        Ok(())
    }

    fn default_tracker_dir() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| TrackerError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".tallytrack").join("trackers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_dir_wins() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/somewhere"))).unwrap();
        assert_eq!(config.tracker_dir(), Path::new("/tmp/somewhere"));
    }

    #[test]
    fn test_default_dir_under_home() {
        if let Ok(config) = Config::resolve(None) {
            assert!(config.tracker_dir().ends_with(".tallytrack/trackers"));
        }
    }

    #[test]
    fn test_ensure_tracker_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let config = Config::with_tracker_dir(temp.path().join("a").join("b"));
        config.ensure_tracker_dir().unwrap();
        assert!(config.tracker_dir().is_dir());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Settings;

const APP_DIR: &str = "remote-file";

pub(crate) fn config_path() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_DIR);
        dir.push("config.json");
        return Ok(dir);
    }
    let mut fallback = std::env::current_dir().context("current dir")?;
    fallback.push("remote-file-config.json");
    Ok(fallback)
}

pub(crate) fn cache_path(file_name: &str) -> PathBuf {
    let mut dir = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    dir.push(APP_DIR);
    dir.push(file_name);
    dir
}

pub(crate) fn log_path() -> PathBuf {
    cache_path("remote-file.log")
}

pub(crate) fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path).context("read config file")?;
    let settings = serde_json::from_str(&content).context("parse config file")?;
    Ok(settings)
}

/// The directory the last explicit save went to.
pub(crate) trait LastUsedStore {
    fn load(&self) -> Option<PathBuf>;
    fn store(&self, dir: &Path) -> Result<()>;
}

pub(crate) struct FileLastUsed {
    path: PathBuf,
}

impl FileLastUsed {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn default_location() -> Self {
        Self::new(cache_path("last-used.txt"))
    }
}

impl LastUsedStore for FileLastUsed {
    fn load(&self) -> Option<PathBuf> {
        let content = fs::read_to_string(&self.path).ok()?;
        let trimmed = content.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    fn store(&self, dir: &Path) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("create cache dir")?;
        }
        fs::write(&self.path, dir.to_string_lossy().as_bytes()).context("write last used dir")?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryLastUsed {
    dir: std::sync::Mutex<Option<PathBuf>>,
    writes: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl MemoryLastUsed {
    pub(crate) fn with_dir(dir: &Path) -> Self {
        let store = Self::default();
        *store.dir.lock().unwrap() = Some(dir.to_path_buf());
        store
    }

    pub(crate) fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[cfg(test)]
impl LastUsedStore for MemoryLastUsed {
    fn load(&self) -> Option<PathBuf> {
        self.dir.lock().unwrap().clone()
    }

    fn store(&self, dir: &Path) -> Result<()> {
        *self.dir.lock().unwrap() = Some(dir.to_path_buf());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("parse config file"));
    }

    #[test]
    fn config_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"poll_interval_ms": 250, "remove_partial_on_failure": true}"#)
            .unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.poll_interval_ms, 250);
        assert!(settings.remove_partial_on_failure);
    }

    #[test]
    fn file_last_used_round_trips_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLastUsed::new(dir.path().join("nested").join("last-used.txt"));
        assert_eq!(store.load(), None);
        store.store(Path::new("/home/me/Downloads")).unwrap();
        assert_eq!(store.load(), Some(PathBuf::from("/home/me/Downloads")));
    }

    #[test]
    fn empty_marker_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last-used.txt");
        fs::write(&path, "\n").unwrap();
        assert_eq!(FileLastUsed::new(path).load(), None);
    }
}

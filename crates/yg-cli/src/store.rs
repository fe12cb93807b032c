use std::fs;
use std::path::{Path, PathBuf};

use yg_core::store::{KeyValueStore, StoreError, Values};

/// Settings store kept in a single JSON object on disk. Every `set` rewrites
/// the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Values,
}

impl FileStore {
    /// Open `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, String> {
        let values = match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Values::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| format!("Invalid store '{}': {}", path.display(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Values::new(),
            Err(e) => return Err(format!("Failed to read '{}': {}", path.display(), e)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, keys: &[&str]) -> Values {
        keys.iter()
            .filter_map(|key| self.values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    fn set(&mut self, values: Values) -> Result<(), StoreError> {
        for (key, value) in values {
            self.values.insert(key, value);
        }
        self.flush()
    }
}

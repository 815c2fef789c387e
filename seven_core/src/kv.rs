//! Key-value backends for the progress store.
//!
//! `JsonFileStore` keeps every key in one JSON object on disk. Writes hold an
//! exclusive lock on a sidecar lock file for the whole read-modify-write and
//! replace the data file atomically (temp file, fsync, rename).

use crate::{Error, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Entries as they sit in the backend
pub type Entries = BTreeMap<String, Value>;

/// Minimal key-value contract the progress store is written against
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    /// Read-modify-write against the freshest entries
    ///
    /// Nothing is written when `f` fails.
    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> Result<()>;

    /// Apply a batch of writes in one step; `None` removes the key
    fn apply(&mut self, updates: Vec<(&str, Option<Value>)>) -> Result<()> {
        self.update(|entries| {
            apply_updates(entries, updates);
            Ok(())
        })
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.apply(vec![(key, Some(value))])
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.apply(vec![(key, None)])
    }
}

/// In-memory backend, used by tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Entries,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> Result<()>,
    {
        let mut entries = self.entries.clone();
        f(&mut entries)?;
        self.entries = entries;
        Ok(())
    }
}

/// File-backed backend holding a single JSON object
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Entries,
}

impl JsonFileStore {
    /// Open the store at `path`, reading whatever is there now
    ///
    /// A missing or unreadable file yields an empty store; nothing is
    /// written until the first update.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, picking up writes from other processes
    pub fn reload(&mut self) {
        self.entries = read_entries(&self.path);
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries) -> Result<()>,
    {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        // Merge onto the latest on-disk state, not our possibly stale copy
        let mut entries = read_entries(&self.path);
        let written = f(&mut entries).and_then(|()| write_entries(&self.path, parent, &entries));

        lock.unlock()?;
        written?;

        self.entries = entries;
        tracing::debug!("Saved store to {:?}", self.path);
        Ok(())
    }
}

fn apply_updates(entries: &mut Entries, updates: Vec<(&str, Option<Value>)>) {
    for (key, value) in updates {
        match value {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
    }
}

fn read_entries(path: &Path) -> Entries {
    if !path.exists() {
        tracing::info!("No store file at {:?}, starting empty", path);
        return BTreeMap::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open store {:?}: {}. Starting empty.", path, e);
            return BTreeMap::new();
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock store {:?}: {}. Starting empty.", path, e);
        return BTreeMap::new();
    }

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    let _ = file.unlock();

    if let Err(e) = read {
        tracing::warn!("Failed to read store {:?}: {}. Starting empty.", path, e);
        return BTreeMap::new();
    }

    match serde_json::from_str::<Map<String, Value>>(&contents) {
        Ok(map) => map.into_iter().collect(),
        Err(e) => {
            tracing::warn!("Failed to parse store {:?}: {}. Starting empty.", path, e);
            BTreeMap::new()
        }
    }
}

fn write_entries(path: &Path, dir: &Path, entries: &Entries) -> Result<()> {
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

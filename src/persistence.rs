//! Key-value stores and the saved-session layout.
//!
//! The saved session is a handful of string keys. The index, the stop list
//! and the closure registry are written as one batch, and [`FileStore`]
//! commits a batch with a single file replace, so a reload never sees one of
//! them without the others. Reads never fail: a missing or
//! unparsable value is reported as absent.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::closures::ClosureRegistry;
use crate::error::StoreError;
use crate::stops::{RouteType, StopList};
use crate::traits::KeyValueStore;

pub const INDEX_KEY: &str = "log_nav_idx";
pub const STOPS_KEY: &str = "log_nav_stops_v6";
pub const ROUTE_TYPE_KEY: &str = "log_nav_route_type";
pub const CLOSURES_KEY: &str = "log_nav_closures";
pub const ADMIN_KEY: &str = "adminSession";

const ADMIN_ACTIVE: &str = "active";

/// In-process store, for tests and for callers that handle durability
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A single JSON object file, rewritten in full on every change.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the
/// original, so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "store file is corrupt, starting empty");
                HashMap::new()
            }),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no store file, starting empty");
                HashMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, values)?;
        writer.flush()?;
        drop(writer);
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.values.contains_key(key) {
            return Ok(());
        }
        let mut next = self.values.clone();
        next.remove(key);
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }

    /// One file replace for the whole batch. On failure neither the file nor
    /// the in-memory values change.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut next = self.values.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }
}

fn read_raw<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "failed to read saved value");
            None
        }
    }
}

fn read_json<T: DeserializeOwned, S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<T> {
    let raw = read_raw(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "saved value is corrupt, ignoring it");
            None
        }
    }
}

fn write_logged<S: KeyValueStore + ?Sized>(store: &mut S, key: &str, value: &str) {
    if let Err(err) = store.set(key, value) {
        warn!(key, error = %err, "failed to persist value");
    }
}

pub fn load_index<S: KeyValueStore + ?Sized>(store: &S) -> Option<usize> {
    let raw = read_raw(store, INDEX_KEY)?;
    match raw.trim().parse() {
        Ok(index) => Some(index),
        Err(_) => {
            warn!(value = %raw, "saved index is not a number, ignoring it");
            None
        }
    }
}

pub fn load_stops<S: KeyValueStore + ?Sized>(store: &S) -> Option<StopList> {
    read_json(store, STOPS_KEY)
}

pub fn load_closures<S: KeyValueStore + ?Sized>(store: &S) -> Option<ClosureRegistry> {
    read_json(store, CLOSURES_KEY)
}

pub fn load_route_type<S: KeyValueStore + ?Sized>(store: &S) -> Option<RouteType> {
    read_raw(store, ROUTE_TYPE_KEY)?.parse().ok()
}

pub fn save_route_type<S: KeyValueStore + ?Sized>(store: &mut S, route_type: RouteType) {
    write_logged(store, ROUTE_TYPE_KEY, route_type.as_str());
}

/// Write the index, the stop list and the closures in one batch. Nothing is
/// written unless all three serialize. Failures are logged and otherwise
/// ignored.
pub fn save_progress<S: KeyValueStore + ?Sized>(
    store: &mut S,
    index: usize,
    stops: &StopList,
    closures: &ClosureRegistry,
) {
    let serialized = serde_json::to_string(stops)
        .and_then(|stops_json| Ok((stops_json, serde_json::to_string(closures)?)));
    let (stops_json, closures_json) = match serialized {
        Ok(pair) => pair,
        Err(err) => {
            warn!(error = %err, "failed to serialize progress, not saving");
            return;
        }
    };
    let index = index.to_string();
    let entries = [
        (INDEX_KEY, index.as_str()),
        (STOPS_KEY, stops_json.as_str()),
        (CLOSURES_KEY, closures_json.as_str()),
    ];
    if let Err(err) = store.set_many(&entries) {
        warn!(error = %err, "failed to persist progress");
    }
}

pub fn load_admin<S: KeyValueStore + ?Sized>(store: &S) -> bool {
    read_raw(store, ADMIN_KEY).as_deref() == Some(ADMIN_ACTIVE)
}

pub fn save_admin<S: KeyValueStore + ?Sized>(store: &mut S, active: bool) {
    let result = if active {
        store.set(ADMIN_KEY, ADMIN_ACTIVE)
    } else {
        store.remove(ADMIN_KEY)
    };
    if let Err(err) = result {
        warn!(error = %err, "failed to persist admin flag");
    }
}

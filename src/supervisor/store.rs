//! Durable record of the last launched server instance.

use std::{fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted `{pid, port}` tuple for the supervised server.
///
/// Presence on disk means a launch once passed its readiness probe; it
/// says nothing about whether the process is still alive. Liveness is
/// always re-verified with a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub pid: u32,
    pub port: u16,
}

/// Storage contract for the service record, so tests can swap the
/// file-backed implementation for an in-memory one.
pub trait StateStore: Send + Sync {
    fn save(&self, record: &ServiceRecord) -> io::Result<()>;
    fn load(&self) -> Option<ServiceRecord>;
    fn clear(&self) -> io::Result<()>;
}

/// Whole-file JSON store at a fixed path.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStore {
    fn save(&self, record: &ServiceRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_vec(record).map_err(io::Error::other)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Option<ServiceRecord> {
        // Corrupt state reads the same as no state.
        let contents = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
pub(crate) struct MemoryStore {
    record: std::sync::Mutex<Option<ServiceRecord>>,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            record: std::sync::Mutex::new(None),
        }
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn save(&self, record: &ServiceRecord) -> io::Result<()> {
        *self.record.lock().expect("store mutex") = Some(*record);
        Ok(())
    }

    fn load(&self) -> Option<ServiceRecord> {
        *self.record.lock().expect("store mutex")
    }

    fn clear(&self) -> io::Result<()> {
        *self.record.lock().expect("store mutex") = None;
        Ok(())
    }
}

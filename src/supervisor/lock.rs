use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

use fs2::FileExt;

/// Advisory exclusive lock serializing check-then-launch sequences
/// across concurrent CLI invocations. Held for the lifetime of the
/// guard; released on drop (and by the OS if the process dies).
#[derive(Debug)]
pub(crate) struct StartLock {
    file: File,
}

impl StartLock {
    pub(crate) fn acquire(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for StartLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

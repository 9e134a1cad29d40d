// oakbase-core/src/storage/file_storage.rs

use super::traits::Storage;
use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

/// File-backed log storage. The append handle is opened lazily and kept
/// across calls; every append is followed by an fsync.
pub struct FileStorage {
    path: PathBuf,
    file: Option<File>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> FileStorage {
        FileStorage { path, file: None }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn open_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(file)
    }
}

impl Storage for FileStorage {
    fn read_all(&mut self) -> Result<String> {
        // drop the append handle so a fresh one picks up after the read
        self.file = None;
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        if self.file.is_none() {
            self.file = Some(self.open_append()?);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(data)?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.sync_all()?;
        }
        Ok(())
    }
}

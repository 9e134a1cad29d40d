// oakbase-core/src/storage/memory_storage.rs

use super::traits::Storage;
use crate::error::{OakbaseError, Result};

/// In-memory log storage, mainly for tests
#[derive(Default)]
pub struct MemoryStorage {
    data: Vec<u8>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn read_all(&mut self) -> Result<String> {
        String::from_utf8(self.data.clone())
            .map_err(|err| OakbaseError::Corruption(format!("log is not valid utf-8: {}", err)))
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut storage = MemoryStorage::new();
        assert!(storage.is_empty());
        storage.append(b"line\n").unwrap();
        assert_eq!(storage.read_all().unwrap(), "line\n");
        assert_eq!(storage.len(), 5);
    }
}

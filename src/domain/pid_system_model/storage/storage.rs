use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::pid_system_model::storage::file::File;
use crate::domain::pid_system_model::utils::id::FileName;
use crate::error::AdmissionError;

/// A storage pool with a fixed capacity and the files currently resident on it.
///
/// Invariant: `available == capacity - sum(resident file sizes)` and `available >= 0`.
#[derive(Debug, Clone)]
pub struct Storage {
    capacity: f64,
    available: f64,
    files: HashMap<FileName, File>,
}

impl Storage {
    pub fn new(capacity: f64) -> Self {
        Storage { capacity, available: capacity, files: HashMap::new() }
    }

    pub fn get_capacity(&self) -> f64 {
        self.capacity
    }

    pub fn get_available(&self) -> f64 {
        self.available
    }

    pub fn current_used_storage(&self) -> f64 {
        self.capacity - self.available
    }

    pub fn contains(&self, name: &FileName) -> bool {
        self.files.contains_key(name)
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn num_of_files(&self) -> usize {
        self.files.len()
    }

    /// Sum of the sizes of all given files which are not resident yet.
    pub fn required_storage<'a>(&self, files: impl IntoIterator<Item = &'a File>) -> f64 {
        files.into_iter().filter(|f| !self.contains(&f.name)).map(|f| f.size).sum()
    }

    /// Makes a file resident. Adding a file that is already resident is a no-op.
    ///
    /// # Returns
    /// `Ok(true)` if the file was charged, `Ok(false)` if it was already resident, and
    /// `InsufficientSpace` if it does not fit (nothing is changed in that case).
    pub fn add_file(&mut self, file: &File) -> Result<bool, AdmissionError> {
        if self.contains(&file.name) {
            return Ok(false);
        }

        if file.size > self.available {
            return Err(AdmissionError::InsufficientSpace { required: file.size, available: self.available });
        }

        self.available -= file.size;
        self.files.insert(file.name.clone(), file.clone());
        Ok(true)
    }

    /// Removes a resident file and returns its space to the pool.
    pub fn remove_file(&mut self, name: &FileName) -> Option<File> {
        let file = self.files.remove(name)?;
        self.available += file.size;
        Some(file)
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.files.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        write!(f, "capacity: {}, available: {}, files: ({})", self.capacity, self.available, names.join(", "))
    }
}

/// Handle to the one storage pool every compute resource writes to.
///
/// All resources hold a clone of this handle, the lock serializes their writes.
#[derive(Debug, Clone)]
pub struct SharedStorage {
    inner: Arc<RwLock<Storage>>,
}

impl SharedStorage {
    pub fn new(capacity: f64) -> Self {
        Self { inner: Arc::new(RwLock::new(Storage::new(capacity))) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Storage> {
        self.inner.read().expect("RwLock poisoned")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Storage> {
        self.inner.write().expect("RwLock poisoned")
    }

    pub fn current_used_storage(&self) -> f64 {
        self.read().current_used_storage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_accounting(storage: &Storage) {
        let resident: f64 = storage.files().map(|f| f.size).sum();
        assert_eq!(storage.get_available() + resident, storage.get_capacity());
        assert!(storage.get_available() >= 0.0);
    }

    #[test]
    fn test_add_is_idempotent_by_name() {
        let mut storage = Storage::new(100.0);
        let file = File::new("a", 40.0);

        assert_eq!(storage.add_file(&file), Ok(true));
        assert_eq!(storage.add_file(&file), Ok(false));
        assert_eq!(storage.get_available(), 60.0);
        assert_accounting(&storage);
    }

    #[test]
    fn test_add_beyond_capacity_is_rejected_without_change() {
        let mut storage = Storage::new(50.0);
        storage.add_file(&File::new("a", 30.0)).unwrap();

        let result = storage.add_file(&File::new("b", 30.0));

        assert_eq!(result, Err(AdmissionError::InsufficientSpace { required: 30.0, available: 20.0 }));
        assert!(!storage.contains(&FileName::new("b")));
        assert_accounting(&storage);
    }

    #[test]
    fn test_remove_returns_space() {
        let mut storage = Storage::new(100.0);
        storage.add_file(&File::new("a", 40.0)).unwrap();
        storage.add_file(&File::new("b", 10.0)).unwrap();

        assert!(storage.remove_file(&FileName::new("a")).is_some());
        assert!(storage.remove_file(&FileName::new("a")).is_none());

        assert_eq!(storage.current_used_storage(), 10.0);
        assert_accounting(&storage);
    }

    #[test]
    fn test_required_storage_skips_resident_files() {
        let mut storage = Storage::new(100.0);
        let resident = File::new("a", 40.0);
        let missing = File::new("b", 15.0);
        storage.add_file(&resident).unwrap();

        assert_eq!(storage.required_storage([&resident, &missing]), 15.0);
    }

    #[test]
    fn test_shared_handle_sees_writes() {
        let shared = SharedStorage::new(10.0);
        let clone = shared.clone();

        clone.write().add_file(&File::new("x", 4.0)).unwrap();

        assert_eq!(shared.current_used_storage(), 4.0);
    }
}

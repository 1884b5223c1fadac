//! Storage is a key-value port for the serialized ledger, modelled after browser local storage.
//!  - [file_storage::FileStorage] keeps every key in its own file inside a directory.
//!  - [MemoryStorage] keeps everything in memory and is handy for tests and dry runs.

pub mod file_storage;

use std::{cell::RefCell, collections::HashMap, ops::Deref};

use anyhow::Result;

/// Interface for abstracting where the ledger document lives.
#[cfg_attr(test, mockall::automock)]
pub trait LedgerStorage {
    /// Returns the value stored under `key`, or `None` when nothing was saved yet.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: Deref> LedgerStorage for T
where
    T::Target: LedgerStorage,
{
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.deref().set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

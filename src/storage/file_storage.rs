use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, Write},
    path::PathBuf,
};

use anyhow::Result;
use fs4::fs_std::FileExt;
use tracing::debug;

use super::LedgerStorage;

/// The main realization of [LedgerStorage]. Every key is a separate `<key>.json` file.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_locked(file: &mut File) -> std::io::Result<String> {
        let mut value = String::new();
        file.read_to_string(&mut value)?;
        Ok(value)
    }

    fn write_locked(file: &mut File, value: &str) -> std::io::Result<()> {
        // Truncation happens only after the lock is held, otherwise a reader could see an empty
        // file.
        file.set_len(0)?;
        file.rewind()?;
        file.write_all(value.as_bytes())?;
        file.flush()
    }
}

impl LedgerStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        debug!("Reading {path:?}");
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };

        FileExt::lock_shared(&file)?;
        let result = Self::read_locked(&mut file);
        FileExt::unlock(&file)?;

        Ok(Some(result?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        debug!("Writing {} bytes into {path:?}", value.len());
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&path)?;

        FileExt::lock_exclusive(&file)?;
        let result = Self::write_locked(&mut file, value);
        FileExt::unlock(&file)?;

        Ok(result?)
    }
}

//! The resource behind the lock: an ordered list of text records,
//! persisted by appending `<record>\n%\n` to a flat file and reloaded by
//! splitting on lines equal to `%`, as `database.py`'s `Database` does.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::errors::Result;

pub struct RecordStore {
    path: PathBuf,
    records: Vec<String>,
}

impl RecordStore {
    /// Loads the file if it exists; a missing file just means an empty
    /// store (it will be created on first write).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecordStore> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(contents) => parse_records(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(RecordStore { path, records })
    }

    /// A uniformly random record, or `None` if the store is empty.
    pub fn read(&self) -> Option<String> {
        if self.records.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.records.len());
        Some(self.records[idx].clone())
    }

    /// Appends to the backing file (flushed before returning), then to
    /// the in-memory list. Callers are responsible for holding the
    /// write lock.
    pub fn write(&mut self, record: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        write!(file, "{}\n%\n", record)?;
        file.flush()?;
        self.records.push(record.to_owned());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_records(contents: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut msg = String::new();
    for line in contents.lines() {
        if line == "%" {
            records.push(msg.clone());
            msg.clear();
        } else {
            msg.push_str(line);
            msg.push('\n');
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dlockd-store-test-{}-{}", process::id(), name))
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let path = scratch_path("missing");
        let _ = fs::remove_file(&path);
        let store = RecordStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.read(), None);
    }

    #[test]
    fn write_then_reload_round_trips() {
        let path = scratch_path("roundtrip");
        let _ = fs::remove_file(&path);

        {
            let mut store = RecordStore::load(&path).unwrap();
            store.write("a fortune").unwrap();
            store.write("a second fortune").unwrap();
            assert_eq!(store.len(), 2);
        }

        let reloaded = RecordStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn parse_records_splits_on_percent_lines() {
        let records = parse_records("one\n%\ntwo\nlines\n%\n");
        assert_eq!(records, vec!["one\n".to_owned(), "two\nlines\n".to_owned()]);
    }
}

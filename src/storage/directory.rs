//! A filesystem backed store
//!
//! The [`DirectoryStore`] keeps each table as a JSON file inside a data
//! directory. Tables are always rewritten whole, through a temporary file
//! that is renamed over the old one, so a failed write never leaves a
//! half-written table behind.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{
    domain::{DeptRow, Record},
    storage::{memory::next_department_id, Store, StoreError},
};

/// File name of the department table.
pub const DEPARTMENTS_FILE: &str = "departments.json";

/// File name of the employee table.
pub const EMPLOYEES_FILE: &str = "employees.json";

/// File name of the ledger configuration.
pub const CONFIG_FILE: &str = "config.toml";

/// A [`Store`] backed by JSON files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens the store rooted at `root`.
    ///
    /// No I/O happens until a table is read or written. Missing tables read
    /// as empty.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the configuration file inside the data directory.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.root.join(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No table at {}, treating as empty", path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Format { path, source })
    }

    fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        let path = self.root.join(name);
        let io_error = |source: io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.root).map_err(io_error)?;
        let mut temp = NamedTempFile::new_in(&self.root).map_err(io_error)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, rows).map_err(|source| {
                StoreError::Format {
                    path: path.clone(),
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&path).map_err(|e| io_error(e.error))?;

        tracing::debug!(rows = rows.len(), "Wrote {}", path.display());
        Ok(())
    }
}

impl Store for DirectoryStore {
    fn fetch_all_departments(&self) -> Result<Vec<DeptRow>, StoreError> {
        let mut rows: Vec<DeptRow> = self.read_table(DEPARTMENTS_FILE)?;
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn fetch_all_employees(&self) -> Result<Vec<Record>, StoreError> {
        self.read_table(EMPLOYEES_FILE)
    }

    fn replace_all_employees(&mut self, records: &[Record]) -> Result<(), StoreError> {
        self.write_table(EMPLOYEES_FILE, records)
    }

    fn insert_department(
        &mut self,
        code: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<i64, StoreError> {
        let mut rows = self.fetch_all_departments()?;
        if rows.iter().any(|row| row.code == code) {
            return Err(StoreError::DuplicateDepartment(code));
        }
        let id = next_department_id(&rows);
        rows.push(DeptRow::new(id, code, name, parent_id));
        self.write_table(DEPARTMENTS_FILE, &rows)?;
        Ok(id)
    }

    fn count_departments(&self) -> Result<usize, StoreError> {
        Ok(self.fetch_all_departments()?.len())
    }
}

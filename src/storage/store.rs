use std::{io, path::PathBuf};

use crate::domain::{DeptRow, Record};

/// A persistent store of departments and employees.
///
/// The ledger only ever talks to the store in whole snapshots: it reads every
/// row on load and replaces the entire employee table on save.
pub trait Store {
    /// Fetches every department row, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn fetch_all_departments(&self) -> Result<Vec<DeptRow>, StoreError>;

    /// Fetches every employee row.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn fetch_all_employees(&self) -> Result<Vec<Record>, StoreError>;

    /// Replaces the entire employee table with `records`.
    ///
    /// Implementations must be atomic: on error the previously stored table
    /// is left intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    fn replace_all_employees(&mut self, records: &[Record]) -> Result<(), StoreError>;

    /// Inserts a department and returns its newly assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is already taken or the store cannot be
    /// written.
    fn insert_department(
        &mut self,
        code: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// Counts the stored departments.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count_departments(&self) -> Result<usize, StoreError>;

    /// Deletes every employee row.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    fn clear_employees(&mut self) -> Result<(), StoreError> {
        self.replace_all_employees(&[])
    }
}

/// Errors reported by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A table file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A table file could not be decoded or encoded.
    #[error("malformed table {}: {source}", path.display())]
    Format {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A department with this code already exists.
    #[error("department code {0} already exists")]
    DuplicateDepartment(i64),

    /// The store rejected the operation for another reason.
    #[error("{0}")]
    Rejected(String),
}

//! An employee ledger over a department tree
//!
//! Employees are held in memory in an AVL-balanced [`OrderedIndex`] keyed by
//! employee number. Departments form a [`Registry`] tree under a virtual root.
//! A [`Ledger`] loads both from a [`Store`] and writes the employee table back
//! as a single full snapshot.

pub mod domain;
pub use domain::{
    Config, DeptFilter, DeptRow, OrderedIndex, Record, RecordError, Registry, SortOrder, ROOT_ID,
};

/// Persistent stores and the ledger that synchronises with them.
pub mod storage;
pub use storage::{
    DirectoryStore, EmployeeUpdate, Ledger, LedgerError, MemoryStore, Store, StoreError,
};

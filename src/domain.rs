//! Domain models for the employee ledger.
//!
//! This module contains the core data structures: the employee
//! [`Record`], the AVL-balanced [`OrderedIndex`] that stores records by
//! employee number, and the department [`Registry`].

mod config;
pub use config::{Config, ConfigError};

/// Ordered index of employee records.
pub mod index;
pub use index::OrderedIndex;

mod ordering;
pub use ordering::{SortOrder, UnknownSortOrder};

mod record;
pub use record::{Record, RecordDisplay, RecordError};

/// Department tree.
pub mod registry;
pub use registry::{DeptFilter, DeptRow, Registry, ROOT_ID};

//! Persistence and synchronisation.
//!
//! A [`Store`] holds departments and employees between runs. The [`Ledger`]
//! loads a full snapshot from a store into memory and writes the whole
//! employee table back on save.

pub mod directory;
mod ledger;
mod memory;
mod store;

pub use directory::{DirectoryStore, CONFIG_FILE, DEPARTMENTS_FILE, EMPLOYEES_FILE};
pub use ledger::{EmployeeUpdate, Ledger, LedgerError};
pub use memory::MemoryStore;
pub use store::{Store, StoreError};

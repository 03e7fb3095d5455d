//! The controlling layer over the in-memory structures
//!
//! A [`Ledger`] owns the department [`Registry`], the employee
//! [`OrderedIndex`] and the [`Store`] they are synchronised with. Once
//! loaded, the index is the single source of truth: mutations go straight
//! to it, and nothing reaches the store until
//! [`Ledger::save_employees_to_store`] is called.

use tracing::instrument;

use crate::{
    domain::{
        registry::ROOT_ID, Config, DeptRow, OrderedIndex, Record, RecordError, Registry, SortOrder,
    },
    storage::{Store, StoreError},
};

/// Departments created in an empty store when
/// [`Config::seed_departments`] is set: `(code, name, parent code)`.
const DEFAULT_DEPARTMENTS: &[(i64, &str, Option<i64>)] = &[
    (1, "Administration", None),
    (2, "Engineering", None),
    (3, "Finance", None),
    (4, "Engineering - Backend", Some(2)),
    (5, "Engineering - Frontend", Some(2)),
];

/// An employee ledger synchronised with a [`Store`].
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    config: Config,
    registry: Registry,
    index: OrderedIndex,
}

/// Changes to apply to an existing employee. `None` fields are left as they
/// are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New department code.
    pub dept_code: Option<i64>,
    /// New salary.
    pub salary: Option<f64>,
}

impl EmployeeUpdate {
    fn apply(self, record: &Record) -> Result<Record, RecordError> {
        let mut updated = record.clone();
        if let Some(name) = self.name {
            updated.set_name(name)?;
        }
        if let Some(dept_code) = self.dept_code {
            updated.dept_code = dept_code;
        }
        if let Some(salary) = self.salary {
            updated.set_salary(salary)?;
        }
        Ok(updated)
    }
}

/// Errors raised by [`Ledger`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The edited record would be invalid.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// An employee with this number already exists.
    #[error("employee {0} already exists")]
    DuplicateEmployee(i64),

    /// No employee has this number.
    #[error("employee {0} not found")]
    EmployeeNotFound(i64),

    /// No department has this code.
    #[error("department code {0} does not exist")]
    UnknownDepartmentCode(i64),

    /// No department has this id.
    #[error("department id {0} does not exist")]
    UnknownDepartmentId(i64),

    /// A department with this code already exists.
    #[error("department code {0} already exists")]
    DuplicateDepartment(i64),
}

impl<S: Store> Ledger<S> {
    /// Opens a ledger over `store`.
    ///
    /// If the store holds no departments and [`Config::seed_departments`] is
    /// set, a default department set is created first. The registry is then
    /// built and every employee is loaded into the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, or if seeding fails.
    #[instrument(level = "debug", skip_all)]
    pub fn open(store: S, config: Config) -> Result<Self, LedgerError> {
        let mut ledger = Self {
            store,
            config,
            registry: Registry::new(),
            index: OrderedIndex::new(),
        };

        if ledger.config.seed_departments && ledger.store.count_departments()? == 0 {
            ledger.seed_departments()?;
        }

        ledger.reload_departments()?;
        ledger.load_employees_from_store()?;
        Ok(ledger)
    }

    fn seed_departments(&mut self) -> Result<(), LedgerError> {
        let mut seeded = Vec::with_capacity(DEFAULT_DEPARTMENTS.len());
        for &(code, name, parent_code) in DEFAULT_DEPARTMENTS {
            let parent_id = parent_code.and_then(|parent_code| {
                seeded
                    .iter()
                    .find(|&&(seeded_code, _)| seeded_code == parent_code)
                    .map(|&(_, id)| id)
            });
            let id = self.store.insert_department(code, name, parent_id)?;
            seeded.push((code, id));
        }
        tracing::info!(count = seeded.len(), "Seeded default departments");
        Ok(())
    }

    /// Rebuilds the registry from the store's department table.
    ///
    /// # Errors
    ///
    /// Returns an error if the departments cannot be fetched. The registry is
    /// unchanged in that case.
    pub fn reload_departments(&mut self) -> Result<(), LedgerError> {
        let rows = self.store.fetch_all_departments()?;
        self.registry.build_from_rows(rows);
        tracing::debug!(departments = self.registry.len(), "Loaded departments");
        Ok(())
    }

    /// Replaces the in-memory employees with the store's employee table.
    ///
    /// Rows repeating an employee number already loaded are dropped; the
    /// first occurrence wins. Returns the number of employees loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the employees cannot be fetched. The index is
    /// unchanged in that case.
    #[instrument(level = "debug", skip(self))]
    pub fn load_employees_from_store(&mut self) -> Result<usize, LedgerError> {
        let rows = self.store.fetch_all_employees()?;

        self.index.clear();
        for record in rows {
            let no = record.no();
            if !self.index.insert(record) {
                tracing::debug!(no, "Dropping duplicate employee row");
            }
        }

        tracing::debug!(employees = self.index.len(), "Loaded employees");
        Ok(self.index.len())
    }

    /// Replaces the store's employee table with the current in-order
    /// snapshot. Returns the number of employees written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write. The in-memory index
    /// is never modified by a save.
    #[instrument(level = "debug", skip(self))]
    pub fn save_employees_to_store(&mut self) -> Result<usize, LedgerError> {
        let snapshot = self.index.inorder();
        self.store.replace_all_employees(&snapshot)?;
        tracing::debug!(employees = snapshot.len(), "Saved employees");
        Ok(snapshot.len())
    }

    /// Creates a department in the store and appends it to the registry.
    ///
    /// A `parent_id` of `None` or [`ROOT_ID`] creates a top-level department.
    /// Returns the new department's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is already in use, the parent does not
    /// exist, or the store rejects the insert.
    #[instrument(level = "debug", skip(self))]
    pub fn add_department(
        &mut self,
        code: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<i64, LedgerError> {
        if self.registry.contains_code(code) {
            return Err(LedgerError::DuplicateDepartment(code));
        }
        let parent_id = parent_id.filter(|&id| id != ROOT_ID);
        if let Some(parent_id) = parent_id {
            if !self.registry.contains_id(parent_id) {
                return Err(LedgerError::UnknownDepartmentId(parent_id));
            }
        }

        let id = self.store.insert_department(code, name, parent_id)?;
        self.registry.append(DeptRow::new(id, code, name, parent_id));

        tracing::info!(id, code, "Added department");
        Ok(id)
    }
}

impl<S> Ledger<S> {
    /// The department registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The employee index.
    #[must_use]
    pub const fn index(&self) -> &OrderedIndex {
        &self.index
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store.
    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn check_dept_code(&self, code: i64) -> Result<(), LedgerError> {
        if self.config.allow_unknown_departments || self.registry.contains_code(code) {
            Ok(())
        } else {
            Err(LedgerError::UnknownDepartmentCode(code))
        }
    }

    /// Adds an employee to the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the employee number is taken, or if the
    /// department code is unknown and the configuration does not allow that.
    pub fn add_employee(&mut self, record: Record) -> Result<(), LedgerError> {
        self.check_dept_code(record.dept_code)?;
        let no = record.no();
        if self.index.insert(record) {
            tracing::info!(no, "Added employee");
            Ok(())
        } else {
            Err(LedgerError::DuplicateEmployee(no))
        }
    }

    /// Edits an employee in place and returns the updated record.
    ///
    /// All changes are validated before any is applied, so on error the
    /// record is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the employee does not exist, the new department
    /// code is not allowed, or the new name or salary is invalid.
    pub fn update_employee(
        &mut self,
        no: i64,
        update: EmployeeUpdate,
    ) -> Result<Record, LedgerError> {
        if let Some(code) = update.dept_code {
            self.check_dept_code(code)?;
        }

        let updated = self
            .index
            .update(no, |record| {
                let updated = update.apply(record)?;
                record.clone_from(&updated);
                Ok::<_, RecordError>(updated)
            })
            .ok_or(LedgerError::EmployeeNotFound(no))??;

        tracing::info!(no, "Updated employee");
        Ok(updated)
    }

    /// Removes an employee and returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EmployeeNotFound`] if there is no such employee.
    pub fn remove_employee(&mut self, no: i64) -> Result<Record, LedgerError> {
        let removed = self
            .index
            .take(no)
            .ok_or(LedgerError::EmployeeNotFound(no))?;
        tracing::info!(no, "Removed employee");
        Ok(removed)
    }

    /// Looks up an employee.
    #[must_use]
    pub fn find_employee(&self, no: i64) -> Option<&Record> {
        self.index.find(no)
    }

    /// Employees in a department and all of its sub-departments, as an owned
    /// snapshot in the requested order.
    ///
    /// Selecting the virtual root ([`ROOT_ID`]) applies no filter.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownDepartmentId`] if `dept_id` is not in the
    /// registry.
    pub fn employees_in(
        &self,
        dept_id: i64,
        order: SortOrder,
    ) -> Result<Vec<Record>, LedgerError> {
        if !self.registry.contains_id(dept_id) {
            return Err(LedgerError::UnknownDepartmentId(dept_id));
        }

        let filter = self.registry.filter_for(dept_id);
        let mut records: Vec<_> = self
            .index
            .iter()
            .filter(|record| filter.matches(record.dept_code))
            .cloned()
            .collect();
        order.sort(&mut records);
        Ok(records)
    }

    /// Removes every employee from the index.
    ///
    /// The store is not touched until the next save.
    pub fn clear_employees(&mut self) {
        self.index.clear();
        tracing::info!("Cleared all employees");
    }
}

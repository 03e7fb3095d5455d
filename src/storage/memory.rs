use crate::{
    domain::{DeptRow, Record},
    storage::{Store, StoreError},
};

/// A [`Store`] held entirely in memory.
///
/// Writes can be made to fail on demand, which makes it easy to check that a
/// failed save leaves both the ledger and the stored snapshot intact.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    departments: Vec<DeptRow>,
    employees: Vec<Record>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with rows.
    #[must_use]
    pub const fn with_rows(departments: Vec<DeptRow>, employees: Vec<Record>) -> Self {
        Self {
            departments,
            employees,
            fail_writes: false,
        }
    }

    /// Makes every subsequent write fail (or succeed again).
    pub const fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// The stored employee table.
    #[must_use]
    pub fn employees(&self) -> &[Record] {
        &self.employees
    }

    /// The stored department table.
    #[must_use]
    pub fn departments(&self) -> &[DeptRow] {
        &self.departments
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            Err(StoreError::Rejected("store is read-only".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Store for MemoryStore {
    fn fetch_all_departments(&self) -> Result<Vec<DeptRow>, StoreError> {
        let mut rows = self.departments.clone();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    fn fetch_all_employees(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.employees.clone())
    }

    fn replace_all_employees(&mut self, records: &[Record]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.employees = records.to_vec();
        Ok(())
    }

    fn insert_department(
        &mut self,
        code: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<i64, StoreError> {
        self.check_writable()?;
        if self.departments.iter().any(|row| row.code == code) {
            return Err(StoreError::DuplicateDepartment(code));
        }
        let id = next_department_id(&self.departments);
        self.departments.push(DeptRow::new(id, code, name, parent_id));
        Ok(id)
    }

    fn count_departments(&self) -> Result<usize, StoreError> {
        Ok(self.departments.len())
    }
}

/// The id the next inserted department receives: one past the largest id in
/// use, starting at 1.
pub(crate) fn next_department_id(rows: &[DeptRow]) -> i64 {
    rows.iter().map(|row| row.id).max().unwrap_or(0).max(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_department_assigns_increasing_ids() {
        let mut store = MemoryStore::new();
        assert_eq!(store.insert_department(10, "Admin", None).unwrap(), 1);
        assert_eq!(store.insert_department(11, "Branch", Some(1)).unwrap(), 2);
        assert_eq!(store.count_departments().unwrap(), 2);
        assert_eq!(
            store.fetch_all_departments().unwrap()[1],
            DeptRow::new(2, 11, "Branch", Some(1))
        );
    }

    #[test]
    fn duplicate_department_code_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert_department(10, "Admin", None).unwrap();
        let err = store.insert_department(10, "Again", None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDepartment(10)));
        assert_eq!(store.count_departments().unwrap(), 1);
    }

    #[test]
    fn failed_replace_keeps_previous_table() {
        let original = vec![Record::new(1, "Ann", 10, 1.0).unwrap()];
        let mut store = MemoryStore::with_rows(Vec::new(), original.clone());
        store.set_fail_writes(true);

        assert!(store.replace_all_employees(&[]).is_err());
        assert_eq!(store.employees(), original.as_slice());
    }

    #[test]
    fn clear_employees_empties_table() {
        let mut store =
            MemoryStore::with_rows(Vec::new(), vec![Record::new(1, "Ann", 10, 1.0).unwrap()]);
        store.clear_employees().unwrap();
        assert!(store.fetch_all_employees().unwrap().is_empty());
    }
}

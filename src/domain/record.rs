use std::fmt;

use serde::{Deserialize, Serialize};

/// An employee row.
///
/// The employee number (`no`) is the record's identity inside the
/// [`OrderedIndex`](crate::OrderedIndex). It can be read from anywhere but
/// only set at construction, so a record checked out for mutation can never
/// be re-keyed in place. The name and salary are likewise only changed
/// through validating setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub struct Record {
    no: i64,
    name: String,
    /// Business code of the department the employee belongs to.
    pub dept_code: i64,
    salary: f64,
}

impl Record {
    /// Creates a validated record.
    ///
    /// The name is trimmed before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyName`] if the name is blank, or
    /// [`RecordError::InvalidSalary`] if the salary is negative or not
    /// finite.
    pub fn new(
        no: i64,
        name: impl Into<String>,
        dept_code: i64,
        salary: f64,
    ) -> Result<Self, RecordError> {
        let name = validate_name(name.into())?;
        let salary = validate_salary(no, salary)?;
        Ok(Self {
            no,
            name,
            dept_code,
            salary,
        })
    }

    /// The unique employee number.
    #[must_use]
    pub const fn no(&self) -> i64 {
        self.no
    }

    /// Display name. Never empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Salary. Always finite and non-negative.
    #[must_use]
    pub const fn salary(&self) -> f64 {
        self.salary
    }

    /// Replaces the name, keeping the record valid.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyName`] if the new name is blank. The record
    /// is unchanged on error.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), RecordError> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    /// Replaces the salary, keeping the record valid.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidSalary`] if the new salary is negative or
    /// not finite. The record is unchanged on error.
    pub fn set_salary(&mut self, salary: f64) -> Result<(), RecordError> {
        self.salary = validate_salary(self.no, salary)?;
        Ok(())
    }

    /// Formats the record with the salary rounded to `decimals` places.
    #[must_use]
    pub fn display(&self, decimals: usize) -> RecordDisplay<'_> {
        RecordDisplay {
            record: self,
            decimals,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display(2), f)
    }
}

/// A one-line rendering of a [`Record`] with configurable salary precision.
#[derive(Debug, Clone, Copy)]
pub struct RecordDisplay<'a> {
    record: &'a Record,
    decimals: usize,
}

impl fmt::Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no={} | name={} | dept={} | salary={:.*}",
            self.record.no,
            self.record.name,
            self.record.dept_code,
            self.decimals,
            self.record.salary
        )
    }
}

fn validate_name(name: String) -> Result<String, RecordError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RecordError::EmptyName);
    }
    if trimmed.len() == name.len() {
        Ok(name)
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_salary(no: i64, salary: f64) -> Result<f64, RecordError> {
    if salary.is_finite() && salary >= 0.0 {
        Ok(salary)
    } else {
        Err(RecordError::InvalidSalary { no, salary })
    }
}

/// Errors raised when constructing or editing a [`Record`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    /// The name was empty or only whitespace.
    #[error("employee name must not be empty")]
    EmptyName,

    /// The salary was negative, infinite or NaN.
    #[error("invalid salary {salary} for employee {no}: must be a finite, non-negative number")]
    InvalidSalary {
        /// The employee number of the offending record.
        no: i64,
        /// The rejected salary.
        salary: f64,
    },
}

/// The serialized shape of a record. Deserialization goes through
/// [`Record::new`] so stored rows are validated on the way in.
#[derive(Debug, Serialize, Deserialize)]
struct RawRecord {
    no: i64,
    name: String,
    dept_code: i64,
    salary: f64,
}

impl TryFrom<RawRecord> for Record {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        Self::new(raw.no, raw.name, raw.dept_code, raw.salary)
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        Self {
            no: record.no,
            name: record.name,
            dept_code: record.dept_code,
            salary: record.salary,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn new_trims_name() {
        let record = Record::new(7, "  Ann  ", 10, 5000.0).unwrap();
        assert_eq!(record.name(), "Ann");
        assert_eq!(record.no(), 7);
    }

    #[test_case(""; "empty")]
    #[test_case("   "; "whitespace only")]
    fn new_rejects_blank_name(name: &str) {
        assert_eq!(Record::new(1, name, 10, 0.0), Err(RecordError::EmptyName));
    }

    #[test_case(-0.01; "negative")]
    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "infinite")]
    fn new_rejects_bad_salary(salary: f64) {
        let err = Record::new(1, "Ann", 10, salary).unwrap_err();
        assert!(matches!(err, RecordError::InvalidSalary { no: 1, .. }));
    }

    #[test]
    fn zero_salary_is_allowed() {
        assert!(Record::new(1, "Ann", 10, 0.0).is_ok());
    }

    #[test]
    fn failed_setter_leaves_record_unchanged() {
        let mut record = Record::new(1, "Ann", 10, 100.0).unwrap();
        assert!(record.set_salary(-1.0).is_err());
        assert!(record.set_name(" ").is_err());
        assert_eq!(record, Record::new(1, "Ann", 10, 100.0).unwrap());
    }

    #[test_case(2, "no=3 | name=Bob | dept=11 | salary=6500.25"; "two decimals")]
    #[test_case(0, "no=3 | name=Bob | dept=11 | salary=6500"; "no decimals")]
    fn display_formats_one_line(decimals: usize, expected: &str) {
        let record = Record::new(3, "Bob", 11, 6500.25).unwrap();
        assert_eq!(record.display(decimals).to_string(), expected);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Record =
            serde_json::from_str(r#"{"no":1,"name":"Ann","dept_code":10,"salary":1.5}"#).unwrap();
        assert_eq!(ok.no(), 1);

        let bad = serde_json::from_str::<Record>(
            r#"{"no":1,"name":"Ann","dept_code":10,"salary":-3.0}"#,
        );
        assert!(bad.is_err());
    }
}

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::Record;

/// The order in which a snapshot of records is presented.
///
/// Every order falls back to the employee number, so the result is total
/// and deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending employee number. This is the index's natural order.
    #[default]
    No,
    /// Ascending department code, then employee number.
    Dept,
    /// Ascending salary, then employee number.
    Salary,
}

impl SortOrder {
    /// Compares two records under this order.
    #[must_use]
    pub fn compare(self, a: &Record, b: &Record) -> Ordering {
        let primary = match self {
            Self::No => Ordering::Equal,
            Self::Dept => a.dept_code.cmp(&b.dept_code),
            Self::Salary => a.salary().total_cmp(&b.salary()),
        };
        primary.then_with(|| a.no().cmp(&b.no()))
    }

    /// Sorts an owned snapshot in place.
    pub fn sort(self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::No => "no",
            Self::Dept => "dept",
            Self::Salary => "salary",
        })
    }
}

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "no" => Ok(Self::No),
            "dept" => Ok(Self::Dept),
            "salary" => Ok(Self::Salary),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognised [`SortOrder`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown sort order '{0}': expected one of no, dept, salary")]
pub struct UnknownSortOrder(String);

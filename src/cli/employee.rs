use std::path::Path;

use clap::Parser;
use staff_ledger::{EmployeeUpdate, Record};
use tracing::instrument;

use super::{open_ledger, terminal::Colorize};

#[derive(Debug, clap::Subcommand)]
pub enum Emp {
    /// Add an employee
    Add(AddEmp),

    /// Change an employee's name, department or salary
    Update(UpdateEmp),

    /// Remove an employee
    Remove(RemoveEmp),

    /// Show a single employee
    Show(ShowEmp),
}

impl Emp {
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(root),
            Self::Update(command) => command.run(root),
            Self::Remove(command) => command.run(root),
            Self::Show(command) => command.run(root),
        }
    }
}

#[derive(Debug, Parser)]
pub struct AddEmp {
    /// Employee number
    #[arg(allow_negative_numbers = true)]
    no: i64,

    /// Display name
    name: String,

    /// Department code
    #[arg(long, short)]
    dept: i64,

    /// Salary
    #[arg(long, short, default_value_t = 0.0)]
    salary: f64,
}

impl AddEmp {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut ledger = open_ledger(root)?;
        let decimals = ledger.config().salary_decimals();

        let record = Record::new(self.no, self.name, self.dept, self.salary)?;
        let line = record.display(decimals).to_string();
        ledger.add_employee(record)?;
        ledger.save_employees_to_store()?;

        println!("{}", format!("Added {line}").success());
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct UpdateEmp {
    /// Employee number
    #[arg(allow_negative_numbers = true)]
    no: i64,

    /// New display name
    #[arg(long, short)]
    name: Option<String>,

    /// New department code
    #[arg(long, short)]
    dept: Option<i64>,

    /// New salary
    #[arg(long, short)]
    salary: Option<f64>,
}

impl UpdateEmp {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        if self.name.is_none() && self.dept.is_none() && self.salary.is_none() {
            anyhow::bail!("Nothing to update: pass at least one of --name, --dept or --salary");
        }

        let mut ledger = open_ledger(root)?;
        let decimals = ledger.config().salary_decimals();

        let updated = ledger.update_employee(
            self.no,
            EmployeeUpdate {
                name: self.name,
                dept_code: self.dept,
                salary: self.salary,
            },
        )?;
        ledger.save_employees_to_store()?;

        println!(
            "{}",
            format!("Updated {}", updated.display(decimals)).success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct RemoveEmp {
    /// Employee number
    #[arg(allow_negative_numbers = true)]
    no: i64,
}

impl RemoveEmp {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut ledger = open_ledger(root)?;
        let decimals = ledger.config().salary_decimals();

        let removed = ledger.remove_employee(self.no)?;
        ledger.save_employees_to_store()?;

        println!(
            "{}",
            format!("Removed {}", removed.display(decimals)).success()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct ShowEmp {
    /// Employee number
    #[arg(allow_negative_numbers = true)]
    no: i64,
}

impl ShowEmp {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let ledger = open_ledger(root)?;
        let decimals = ledger.config().salary_decimals();

        let Some(record) = ledger.find_employee(self.no) else {
            anyhow::bail!("{}", format!("Employee {} not found", self.no).warning());
        };

        let department = ledger
            .registry()
            .id_of_code(record.dept_code)
            .map_or("unknown department", |id| ledger.registry().name_of(id));

        println!("{}", record.display(decimals));
        println!("{}", format!("  department: {department}").dim());
        Ok(())
    }
}

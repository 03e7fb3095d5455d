use std::path::Path;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use staff_ledger::{Record, Registry, SortOrder, ROOT_ID};
use tracing::instrument;

use super::{
    open_ledger,
    terminal::{self, Colorize},
};

/// Names are never cut shorter than this, however narrow the terminal.
const MIN_NAME_WIDTH: usize = 8;

/// Command arguments for `staff list`.
#[derive(Debug, Default, Parser)]
pub struct List {
    /// Department id; lists that department and all of its sub-departments
    /// (default: every department)
    #[arg(long, short, default_value_t = ROOT_ID)]
    dept: i64,

    /// Sort order: no, dept or salary
    #[arg(long, short, default_value_t)]
    sort: SortOrder,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting
    #[arg(long, short)]
    quiet: bool,
}

/// Output formats for `staff list`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// One listed employee, with the department resolved to a name.
#[derive(Debug, Serialize)]
struct Row {
    no: i64,
    name: String,
    dept_code: i64,
    department: String,
    salary: f64,
}

impl Row {
    fn new(record: &Record, registry: &Registry) -> Self {
        let department = registry
            .id_of_code(record.dept_code)
            .map_or_else(String::new, |id| registry.name_of(id).to_string());
        Self {
            no: record.no(),
            dept_code: record.dept_code,
            salary: record.salary(),
            name: record.name().to_string(),
            department,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let ledger = open_ledger(root)?;
        let decimals = ledger.config().salary_decimals();

        let rows: Vec<Row> = ledger
            .employees_in(self.dept, self.sort)?
            .iter()
            .map(|record| Row::new(record, ledger.registry()))
            .collect();

        match self.output {
            OutputFormat::Table => {
                if !self.quiet && self.dept != ROOT_ID {
                    println!(
                        "{}",
                        format!(
                            "{} and sub-departments",
                            ledger.registry().name_of(self.dept)
                        )
                        .heading()
                    );
                }
                render_table(&rows, decimals, self.quiet);
            }
            OutputFormat::Json => render_json(&rows)?,
        }
        Ok(())
    }
}

fn render_table(rows: &[Row], decimals: usize, quiet: bool) {
    let data: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.no.to_string(),
                row.name.clone(),
                if row.department.is_empty() {
                    row.dept_code.to_string()
                } else {
                    format!("{} {}", row.dept_code, row.department)
                },
                format!("{:.*}", decimals, row.salary),
            ]
        })
        .collect();

    if quiet {
        for row in data {
            println!("{}", row.join("\t"));
        }
        return;
    }

    if data.is_empty() {
        println!("{}", "No employees".dim());
        return;
    }

    let headers = ["NO", "NAME", "DEPARTMENT", "SALARY"];
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            data.iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect();

    // shrink the name column to fit the terminal
    if let Some(available) = terminal::terminal_width() {
        let others: usize = widths
            .iter()
            .enumerate()
            .filter(|&(idx, _)| idx != 1)
            .map(|(_, width)| width + 2)
            .sum();
        let fit = available.saturating_sub(others + 2).max(MIN_NAME_WIDTH);
        widths[1] = widths[1].min(fit);
    }

    for (header, width) in headers.iter().zip(&widths) {
        print!("{}  ", format!("{header:<width$}").heading());
    }
    println!();

    for width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();

    for row in &data {
        for (idx, value) in row.iter().enumerate() {
            let width = widths[idx];
            let value = terminal::truncate(value, width);
            if idx == 3 {
                print!("{value:>width$}  ");
            } else {
                print!("{value:<width$}  ");
            }
        }
        println!();
    }
}

fn render_json(rows: &[Row]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(std::io::stdout(), rows)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

use std::path::Path;

use clap::Parser;
use staff_ledger::{Registry, ROOT_ID};
use tracing::instrument;

use super::{open_ledger, terminal::Colorize};

#[derive(Debug, clap::Subcommand)]
pub enum Dept {
    /// Create a department
    Add(AddDept),

    /// Print the department tree
    Tree,
}

impl Dept {
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(root),
            Self::Tree => print_tree(root),
        }
    }
}

#[derive(Debug, Parser)]
pub struct AddDept {
    /// Business code of the new department
    code: i64,

    /// Display name of the new department
    name: String,

    /// Id of the parent department (defaults to top level)
    #[arg(long, short)]
    parent: Option<i64>,
}

impl AddDept {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut ledger = open_ledger(root)?;
        let name = self.name.trim();
        if name.is_empty() {
            anyhow::bail!("Department name must not be empty");
        }

        let id = ledger.add_department(self.code, name, self.parent)?;
        let parent = ledger.registry().parent_of(id).unwrap_or(ROOT_ID);

        println!(
            "{}",
            format!(
                "Added department {name} (id={id}, code={}) under {}",
                self.code,
                ledger.registry().name_of(parent)
            )
            .success()
        );
        Ok(())
    }
}

#[instrument]
fn print_tree(root: &Path) -> anyhow::Result<()> {
    let ledger = open_ledger(root)?;
    for line in tree_lines(ledger.registry()) {
        println!("{line}");
    }
    Ok(())
}

fn tree_lines(registry: &Registry) -> Vec<String> {
    registry
        .walk()
        .into_iter()
        .map(|(depth, id)| {
            let indent = "  ".repeat(depth);
            if id == ROOT_ID {
                format!("{indent}{}", registry.name_of(id).heading())
            } else {
                let detail = format!("(id={id}, code={})", registry.code_of(id));
                format!("{indent}{} {}", registry.name_of(id), detail.dim())
            }
        })
        .collect()
}

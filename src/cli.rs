use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
};

mod department;
mod employee;
mod list;
mod terminal;

use clap::ArgAction;
use department::Dept;
use employee::Emp;
use list::List;
use staff_ledger::{Config, DirectoryStore, Ledger};
use tracing::instrument;

use self::terminal::Colorize;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the ledger's data directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Initialize a new ledger (creates config.toml and the default departments)
    Init,

    /// Manage departments
    #[command(subcommand)]
    Dept(Dept),

    /// Manage employees
    #[command(subcommand)]
    Emp(Emp),

    /// List employees, optionally restricted to a department subtree (default)
    List(List),

    /// Remove every employee from the ledger
    Clear(Clear),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Init => Init::run(root)?,
            Self::Dept(command) => command.run(root)?,
            Self::Emp(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Clear(command) => command.run(root)?,
        }
        Ok(())
    }
}

/// Opens the ledger stored in `root`, reading `config.toml` if present.
fn open_ledger(root: &Path) -> anyhow::Result<Ledger<DirectoryStore>> {
    let store = DirectoryStore::new(root.to_path_buf());
    let config = Config::load_or_default(&store.config_path())?;
    Ok(Ledger::open(store, config)?)
}

#[derive(Debug)]
struct Init;

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        let store = DirectoryStore::new(root.to_path_buf());
        let config_path = store.config_path();
        if config_path.exists() {
            anyhow::bail!(
                "Ledger already initialized (found existing {})",
                config_path.display()
            );
        }

        std::fs::create_dir_all(root)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory: {e}"))?;

        let config = Config::default();
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        let ledger = Ledger::open(store, config)?;

        println!(
            "{}",
            format!("Initialized ledger in {}", root.display()).success()
        );
        println!("  Departments: {}", ledger.registry().len());
        println!("  Employees:   {}", ledger.index().len());
        println!();
        println!("Next steps:");
        println!("  staff dept tree");
        println!("  staff emp add 1001 \"Your Name\" --dept 1 --salary 5000");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Clear {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl Clear {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut ledger = open_ledger(root)?;
        let count = ledger.index().len();

        if count == 0 {
            println!("{}", "No employees to clear".dim());
            return Ok(());
        }

        if !self.yes {
            eprint!("Remove all {count} employee(s)? (y/N) ");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            if !line.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled");
                return Ok(());
            }
        }

        ledger.clear_employees();
        ledger.save_employees_to_store()?;

        println!("{}", format!("Removed {count} employee(s)").success());
        Ok(())
    }
}

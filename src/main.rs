use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use cadence::config::Config;
use cadence::logging;
use cadence::worker::Cadence;

mod cmd;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version, about = "Scheduled worker orchestrator with daily, weekly and monthly batches")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory. Defaults to $CADENCE_WORKSPACE, then ~/.cadence
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run batches immediately (daily then weekly when no cadence is given)
    Run {
        #[arg(short, long, value_enum)]
        cadence: Option<CadenceArg>,
    },
    /// Poll the schedule and run batches as they come due, until Ctrl-C
    Daemon,
    /// Run a single worker by name and print its result
    Worker { name: String },
    /// Show each worker's status, the next scheduled runs and recent reports
    Status,
    /// Show the latest value of every metric and the most recent samples
    Metrics {
        /// Number of recent samples to list
        #[arg(long, default_value = "20")]
        recent: usize,
    },
    /// List or show generated reports
    Reports {
        #[command(subcommand)]
        command: Option<ReportsCommands>,

        /// Number of reports to list
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CadenceArg {
    Daily,
    Weekly,
    Monthly,
    All,
}

impl CadenceArg {
    pub fn cadences(self) -> Vec<Cadence> {
        match self {
            CadenceArg::Daily => vec![Cadence::Daily],
            CadenceArg::Weekly => vec![Cadence::Weekly],
            CadenceArg::Monthly => vec![Cadence::Monthly],
            CadenceArg::All => Cadence::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum ReportsCommands {
    /// Print a report by file name
    Show { name: String },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default cadence.toml into the workspace
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::new(cli.workspace.clone(), cli.verbose)?;

    match &cli.command {
        Commands::Run { cadence } => {
            let _guard = logging::init(&config.log_dir, config.verbose)?;
            cmd::cmd_run(&config, *cadence).await?;
        }
        Commands::Daemon => {
            let _guard = logging::init(&config.log_dir, config.verbose)?;
            cmd::cmd_daemon(&config).await?;
        }
        Commands::Worker { name } => {
            let _guard = logging::init(&config.log_dir, config.verbose)?;
            cmd::cmd_worker(&config, name).await?;
        }
        Commands::Status => cmd::cmd_status(&config)?,
        Commands::Metrics { recent } => cmd::cmd_metrics(&config, *recent)?,
        Commands::Reports { command, limit } => cmd::cmd_reports(&config, command.clone(), *limit)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}

use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use etfwatch::core::log::init_logging;
use etfwatch::core::model::{is_business_day, previous_business_day};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Snapshot date (YYYY-MM-DD), defaults to the latest business day
    #[arg(short, long, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for etfwatch::AppCommand {
    fn from(cmd: Commands) -> etfwatch::AppCommand {
        match cmd {
            Commands::Funds { theme } => etfwatch::AppCommand::Funds { theme },
            Commands::Holdings { fund, top } => etfwatch::AppCommand::Holdings { fund, top },
            Commands::Compare { fund, previous } => {
                etfwatch::AppCommand::Compare { fund, previous }
            }
            Commands::History {
                fund,
                instrument,
                from,
            } => etfwatch::AppCommand::History {
                fund,
                instrument,
                from,
            },
            Commands::Duplicates { min_funds, limit } => {
                etfwatch::AppCommand::Duplicates { min_funds, limit }
            }
            Commands::Ranking { top } => etfwatch::AppCommand::Ranking { top },
            Commands::Distribution => etfwatch::AppCommand::Distribution,
            Commands::Theme { keyword, limit } => etfwatch::AppCommand::Theme { keyword, limit },
            Commands::Overlap { fund_a, fund_b } => {
                etfwatch::AppCommand::Overlap { fund_a, fund_b }
            }
            Commands::Summary => etfwatch::AppCommand::Summary,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List tracked funds
    Funds {
        /// Additionally require this theme keyword
        #[arg(long)]
        theme: Option<String>,
    },
    /// Show a fund's largest holdings
    Holdings {
        fund: String,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Compare a fund's holdings against an earlier snapshot
    Compare {
        fund: String,
        /// Earlier snapshot date, defaults to the previous business day
        #[arg(long)]
        previous: Option<NaiveDate>,
    },
    /// Show an instrument's weight history within a fund
    History {
        fund: String,
        instrument: String,
        /// First date to collect, defaults to 30 days before --date
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Instruments held by several funds
    Duplicates {
        #[arg(long)]
        min_funds: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Instruments ranked by total amount across funds
    Ranking {
        #[arg(long)]
        top: Option<usize>,
    },
    /// Histogram of holding weights
    Distribution,
    /// Statistics for funds whose name contains a keyword
    Theme {
        keyword: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Instruments shared by two funds
    Overlap { fund_a: String, fund_b: String },
    /// Overall snapshot summary
    Summary,
}

fn default_date() -> NaiveDate {
    let today = chrono::Local::now().date_naive();
    if is_business_day(today) {
        today
    } else {
        previous_business_day(today)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => etfwatch::cli::setup::setup_at_path(path),
            None => etfwatch::cli::setup::setup(),
        },
        Some(cmd) => {
            let date = cli.date.unwrap_or_else(default_date);
            etfwatch::run_command(cmd.into(), date, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{CapacityArgs, ScheduleArgs, VariableRateArgs};
use commands::planning::{InvestmentArgs, OptimizeArgs};
use commands::rates::{BankRatesArgs, RateAlertsArgs};
use commands::risk::{CompareOffersArgs, StressTestArgs};

/// French mortgage simulations
#[derive(Parser)]
#[command(
    name = "simulpret",
    version,
    about = "French mortgage simulations",
    long_about = "A CLI for French mortgage simulations with decimal precision. Supports \
                  borrowing capacity, amortization schedules, variable-rate projections, \
                  down-payment/duration optimisation, rental investment, stress tests \
                  and multi-offer comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Policy file (YAML or JSON) overriding the built-in defaults
    #[arg(long, global = true)]
    policy: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Maximum borrowable amount from income
    Capacity(CapacityArgs),
    /// Month-by-month amortization schedule
    Schedule(ScheduleArgs),
    /// Project a loan along a fixed-then-variable rate path
    VariableRate(VariableRateArgs),
    /// Search down payment x duration for the cheapest affordable loan
    Optimize(OptimizeArgs),
    /// Rental investment cash flow and yields
    Investment(InvestmentArgs),
    /// Household budget under income and expense shocks
    StressTest(StressTestArgs),
    /// Rank bank offers by total cost of credit
    CompareOffers(CompareOffersArgs),
    /// Published bank rates (reference table merged with a feed)
    BankRates(BankRatesArgs),
    /// Check rate alerts against the bank-rate table
    RateAlerts(RateAlertsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let policy = match input::file::read_policy(cli.policy.as_deref()) {
        Ok(policy) => policy,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Capacity(args) => commands::loan::run_capacity(args, &policy),
        Commands::Schedule(args) => commands::loan::run_schedule(args, &policy),
        Commands::VariableRate(args) => commands::loan::run_variable_rate(args, &policy),
        Commands::Optimize(args) => commands::planning::run_optimize(args, &policy),
        Commands::Investment(args) => commands::planning::run_investment(args, &policy),
        Commands::StressTest(args) => commands::risk::run_stress_test(args, &policy),
        Commands::CompareOffers(args) => commands::risk::run_compare_offers(args, &policy),
        Commands::BankRates(args) => commands::rates::run_bank_rates(args),
        Commands::RateAlerts(args) => commands::rates::run_rate_alerts(args),
        Commands::Version => {
            println!("simulpret {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use simulpret_core::api::{CapacityRequest, ScheduleRequest, VariableRateRequest};
use simulpret_core::SimulationPolicy;

use crate::input;

/// Arguments for borrowing capacity
#[derive(Args)]
pub struct CapacityArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Net monthly income
    #[arg(long, alias = "salaire")]
    pub income: Option<Decimal>,

    /// Other monthly income (rents, allowances)
    #[arg(long, default_value = "0")]
    pub other_income: Decimal,

    /// Existing monthly charges
    #[arg(long, default_value = "0")]
    pub expenses: Decimal,

    /// Nominal annual rate in percent
    #[arg(long, alias = "taux")]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "duree")]
    pub term: Option<u32>,

    /// Maximum effort ratio, e.g. 0.33 (policy default otherwise)
    #[arg(long)]
    pub max_effort: Option<Decimal>,
}

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,
}

/// Arguments for the variable-rate projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct VariableRateArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Net monthly income (sizes the loan)
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Existing monthly charges
    #[arg(long, default_value = "0")]
    pub expenses: Decimal,

    /// Initial annual rate in percent
    #[arg(long)]
    pub initial_rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Months at the initial rate
    #[arg(long, default_value = "60")]
    pub fixed_period: u32,

    /// Yearly rate change after the fixed period, in points (may be negative)
    #[arg(long, default_value = "0")]
    pub annual_variation: Decimal,

    /// Cap on the move away from the initial rate, in points
    #[arg(long)]
    pub cap: Option<Decimal>,
}

pub fn run_capacity(args: CapacityArgs, policy: &SimulationPolicy) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CapacityRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => CapacityRequest {
            salaire: args.income.ok_or("--income is required (or provide --input)")?,
            autres_revenus: args.other_income,
            charges: args.expenses,
            taux: args.rate.ok_or("--rate is required (or provide --input)")?,
            duree: args.term.ok_or("--term is required (or provide --input)")?,
            taux_effort_max: args.max_effort,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs, policy: &SimulationPolicy) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ScheduleRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => ScheduleRequest {
            montant: args.principal.ok_or("--principal is required (or provide --input)")?,
            taux: args.rate.ok_or("--rate is required (or provide --input)")?,
            duree: args.term.ok_or("--term is required (or provide --input)")?,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_variable_rate(
    args: VariableRateArgs,
    policy: &SimulationPolicy,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: VariableRateRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => VariableRateRequest {
            salaire: args.income.ok_or("--income is required (or provide --input)")?,
            charges: args.expenses,
            taux_initial: args
                .initial_rate
                .ok_or("--initial-rate is required (or provide --input)")?,
            duree: args.term.ok_or("--term is required (or provide --input)")?,
            periode_fixe: args.fixed_period,
            variation_annuelle: args.annual_variation,
            cap_taux: args.cap,
            taux_effort_max: None,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use simulpret_core::api::{InvestmentRequest, OptimizationRequest};
use simulpret_core::SimulationPolicy;

use crate::input;

/// Arguments for down-payment / duration optimisation
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Net monthly income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Existing monthly charges
    #[arg(long, default_value = "0")]
    pub expenses: Decimal,

    /// Property price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Nominal annual rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Shortest duration in months
    #[arg(long, default_value = "120")]
    pub min_term: u32,

    /// Longest duration in months
    #[arg(long, default_value = "300")]
    pub max_term: u32,

    /// Cash available for the down payment
    #[arg(long)]
    pub savings: Option<Decimal>,

    /// Maximum effort ratio, e.g. 0.33 (policy default otherwise)
    #[arg(long)]
    pub max_effort: Option<Decimal>,

    /// Down-payment percentages to try (policy grid otherwise)
    #[arg(long, value_delimiter = ',')]
    pub down_payments: Option<Vec<Decimal>>,
}

/// Arguments for rental investment analysis
#[derive(Args)]
pub struct InvestmentArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Property price
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Down payment
    #[arg(long, default_value = "0")]
    pub down_payment: Decimal,

    /// Nominal annual rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Monthly rent
    #[arg(long)]
    pub rent: Option<Decimal>,

    /// Monthly charges
    #[arg(long, default_value = "0")]
    pub charges: Decimal,

    /// Annual property tax
    #[arg(long, default_value = "0")]
    pub taxes: Decimal,
}

pub fn run_optimize(args: OptimizeArgs, policy: &SimulationPolicy) -> Result<Value, Box<dyn std::error::Error>> {
    let request: OptimizationRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => OptimizationRequest {
            salaire: args.income.ok_or("--income is required (or provide --input)")?,
            autres_revenus: Decimal::ZERO,
            charges: args.expenses,
            prix_bien: args.price.ok_or("--price is required (or provide --input)")?,
            taux: args.rate.ok_or("--rate is required (or provide --input)")?,
            duree_min: args.min_term,
            duree_max: args.max_term,
            taux_effort_max: args.max_effort,
            epargne_disponible: args.savings,
            apports_pct: args.down_payments,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_investment(args: InvestmentArgs, policy: &SimulationPolicy) -> Result<Value, Box<dyn std::error::Error>> {
    let request: InvestmentRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => InvestmentRequest {
            prix_bien: args.price.ok_or("--price is required (or provide --input)")?,
            apport: args.down_payment,
            taux: args.rate.ok_or("--rate is required (or provide --input)")?,
            duree: args.term.ok_or("--term is required (or provide --input)")?,
            loyer_mensuel: args.rent.ok_or("--rent is required (or provide --input)")?,
            charges_mensuelles: args.charges,
            impots_annuels: args.taxes,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use simulpret_core::api::{MultiOfferRequest, StressTestRequest};
use simulpret_core::SimulationPolicy;

use crate::input;

/// Arguments for the budget stress test
#[derive(Args)]
pub struct StressTestArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Net monthly income
    #[arg(long)]
    pub income: Option<Decimal>,

    /// Existing monthly charges
    #[arg(long, default_value = "0")]
    pub expenses: Decimal,

    /// Current monthly loan payment
    #[arg(long)]
    pub payment: Option<Decimal>,
}

/// Arguments for multi-offer comparison
#[derive(Args)]
pub struct CompareOffersArgs {
    /// Path to JSON request file with `prix_bien`, `apport` and `offers`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_stress_test(args: StressTestArgs, policy: &SimulationPolicy) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StressTestRequest = match input::read_request(args.input.as_deref())? {
        Some(request) => request,
        None => StressTestRequest {
            salaire: args.income.ok_or("--income is required (or provide --input)")?,
            charges: args.expenses,
            mensualite_actuelle: args.payment.ok_or("--payment is required (or provide --input)")?,
        },
    };
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare_offers(
    args: CompareOffersArgs,
    policy: &SimulationPolicy,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: MultiOfferRequest = input::read_request(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for offer comparison")?;
    let result = request.run(policy)?;
    Ok(serde_json::to_value(result)?)
}

use chrono::Utc;
use clap::Args;
use serde_json::{json, Value};

use simulpret_core::bank_rates::{self, BankRateTable, RateAlert};

use crate::input;

/// Arguments for the bank-rate table
#[derive(Args)]
pub struct BankRatesArgs {
    /// Fetched rate table (JSON) merged over the reference table
    #[arg(long)]
    pub rates: Option<String>,

    /// Only report the best rate for this term in months
    #[arg(long)]
    pub term: Option<u32>,
}

/// Arguments for rate-alert evaluation
#[derive(Args)]
pub struct RateAlertsArgs {
    /// Path to JSON array of alerts
    #[arg(long)]
    pub input: Option<String>,

    /// Fetched rate table (JSON) merged over the reference table
    #[arg(long)]
    pub rates: Option<String>,
}

fn load_table(path: Option<&str>) -> Result<BankRateTable, Box<dyn std::error::Error>> {
    let reference = BankRateTable::reference(Utc::now());
    Ok(match path {
        Some(path) => reference.merge(input::file::read_json(path)?),
        None => reference,
    })
}

pub fn run_bank_rates(args: BankRatesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_table(args.rates.as_deref())?;

    match args.term {
        Some(term) => {
            let (bank, rate) = table
                .best_for_term(term)
                .ok_or_else(|| format!("No published rate covers {term} months"))?;
            Ok(json!({
                "result": {
                    "bank_name": bank.bank_name,
                    "term_months": term,
                    "rate_pct": rate,
                    "last_updated": bank.last_updated,
                }
            }))
        }
        None => Ok(json!({ "results": serde_json::to_value(&table.rates)? })),
    }
}

pub fn run_rate_alerts(args: RateAlertsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let alerts: Vec<RateAlert> = input::read_request(args.input.as_deref())?
        .ok_or("--input <alerts.json> or stdin required for rate alerts")?;
    let table = load_table(args.rates.as_deref())?;

    let evaluations = bank_rates::evaluate_alerts(&table, &alerts);
    let triggered = evaluations.iter().filter(|e| e.triggered).count();
    tracing::info!(alerts = alerts.len(), triggered, "rate alerts evaluated");

    let rows: Vec<Value> = evaluations
        .into_iter()
        .map(|e| {
            json!({
                "bank_name": e.alert.bank_name,
                "duration_months": e.alert.duration_months,
                "target_rate_pct": e.alert.target_rate_pct,
                "current_rate_pct": e.alert.current_rate_pct,
                "notified": e.alert.notified,
                "triggered": e.triggered,
            })
        })
        .collect();
    Ok(json!({ "results": rows }))
}

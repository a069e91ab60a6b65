//! Shared application state
//!
//! Everything here is read-only after start-up; handlers share it through
//! `Arc` without locking.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use simulpret_core::bank_rates::BankRateTable;
use simulpret_core::SimulationPolicy;

use crate::{ServerConfig, ServerError};

#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<SimulationPolicy>,
    pub bank_rates: Arc<BankRateTable>,
}

impl AppState {
    pub fn new(policy: SimulationPolicy, bank_rates: BankRateTable) -> Self {
        Self {
            policy: Arc::new(policy),
            bank_rates: Arc::new(bank_rates),
        }
    }

    /// Load the policy and bank-rate files named in the configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let policy = match &config.policy_path {
            Some(path) => load_policy(path)?,
            None => SimulationPolicy::default(),
        };

        let reference = BankRateTable::reference(Utc::now());
        let bank_rates = match &config.bank_rates_path {
            Some(path) => {
                let fetched = BankRateTable::from_json_str(&read(path)?)?;
                tracing::info!(path = %path, banks = fetched.rates.len(), "bank rates loaded");
                reference.merge(fetched)
            }
            None => reference,
        };

        Ok(Self::new(policy, bank_rates))
    }
}

fn read(path: &str) -> Result<String, ServerError> {
    std::fs::read_to_string(path)
        .map_err(|e| ServerError::Config(format!("Failed to read '{path}': {e}")))
}

fn load_policy(path: &str) -> Result<SimulationPolicy, ServerError> {
    let contents = read(path)?;
    let is_yaml = matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let policy = if is_yaml {
        SimulationPolicy::from_yaml_str(&contents)?
    } else {
        SimulationPolicy::from_json_str(&contents)?
    };
    tracing::info!(path = %path, "simulation policy loaded");
    Ok(policy)
}

//! Simulation policy
//!
//! Business constants that are policy choices rather than arithmetic: the
//! default effort ratio, the optimizer's down-payment grid, rental reporting
//! horizons and the stress-test perturbation table. Every field has a serde
//! default, so a policy file only needs to name what it overrides.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::types::{Months, RatePct, Ratio, MAX_RATE_PCT, MAX_TERM_MONTHS};
use crate::SimulationResult;

/// Engine-wide policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPolicy {
    /// Effort ratio (payment / income) applied when a request omits one
    #[serde(default = "default_max_effort_ratio")]
    pub default_max_effort_ratio: Ratio,

    /// Down-payment percentages the optimizer searches
    #[serde(default = "default_down_payment_grid")]
    pub down_payment_grid_pct: Vec<Decimal>,

    /// Reporting horizons of the rental analyzer, in years
    #[serde(default = "default_rental_horizons")]
    pub rental_horizons_years: Vec<u32>,

    /// Longest accepted loan term
    #[serde(default = "default_max_term")]
    pub max_term_months: Months,

    /// Highest accepted nominal annual rate
    #[serde(default = "default_max_rate")]
    pub max_annual_rate_pct: RatePct,

    /// Stress-test perturbations and risk thresholds
    #[serde(default)]
    pub stress: StressPolicy,
}

/// Stress-test constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressPolicy {
    /// Share of income kept on unemployment benefits
    #[serde(default = "default_job_loss_factor")]
    pub job_loss_income_factor: Decimal,
    /// Income multiplier of the "-20%" scenario
    #[serde(default = "default_income_drop_factor")]
    pub income_drop_factor: Decimal,
    /// Expense multiplier of the "+15%" scenario
    #[serde(default = "default_expense_rise_factor")]
    pub expense_rise_factor: Decimal,
    /// A scenario stays viable up to this effort ratio (percent)
    #[serde(default = "default_viability_effort_pct")]
    pub viability_effort_pct: Decimal,
    /// Safety margin below which the global risk is high (percent)
    #[serde(default = "default_high_risk_below")]
    pub high_risk_below_pct: Decimal,
    /// Safety margin below which the global risk is medium (percent)
    #[serde(default = "default_medium_risk_below")]
    pub medium_risk_below_pct: Decimal,
}

// Default values
fn default_max_effort_ratio() -> Ratio {
    dec!(0.33)
}

fn default_down_payment_grid() -> Vec<Decimal> {
    vec![dec!(0), dec!(10), dec!(20), dec!(30)]
}

fn default_rental_horizons() -> Vec<u32> {
    vec![5, 10, 15, 20]
}

fn default_max_term() -> Months {
    600 // 50 years
}

fn default_max_rate() -> RatePct {
    dec!(100)
}

fn default_job_loss_factor() -> Decimal {
    dec!(0.57) // ARE replacement rate
}

fn default_income_drop_factor() -> Decimal {
    dec!(0.80)
}

fn default_expense_rise_factor() -> Decimal {
    dec!(1.15)
}

fn default_viability_effort_pct() -> Decimal {
    dec!(33)
}

fn default_high_risk_below() -> Decimal {
    dec!(20)
}

fn default_medium_risk_below() -> Decimal {
    dec!(50)
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            default_max_effort_ratio: default_max_effort_ratio(),
            down_payment_grid_pct: default_down_payment_grid(),
            rental_horizons_years: default_rental_horizons(),
            max_term_months: default_max_term(),
            max_annual_rate_pct: default_max_rate(),
            stress: StressPolicy::default(),
        }
    }
}

impl Default for StressPolicy {
    fn default() -> Self {
        Self {
            job_loss_income_factor: default_job_loss_factor(),
            income_drop_factor: default_income_drop_factor(),
            expense_rise_factor: default_expense_rise_factor(),
            viability_effort_pct: default_viability_effort_pct(),
            high_risk_below_pct: default_high_risk_below(),
            medium_risk_below_pct: default_medium_risk_below(),
        }
    }
}

impl SimulationPolicy {
    /// Parse a YAML policy document and validate it.
    pub fn from_yaml_str(s: &str) -> SimulationResult<Self> {
        let policy: SimulationPolicy = serde_yaml::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parse a JSON policy document and validate it.
    pub fn from_json_str(s: &str) -> SimulationResult<Self> {
        let policy: SimulationPolicy = serde_json::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        validate_effort_ratio("default_max_effort_ratio", self.default_max_effort_ratio)?;

        if self.down_payment_grid_pct.is_empty() {
            return Err(SimulationError::invalid(
                "down_payment_grid_pct",
                "At least one down-payment percentage is required",
            ));
        }
        if self
            .down_payment_grid_pct
            .iter()
            .any(|p| *p < Decimal::ZERO || *p >= dec!(100))
        {
            return Err(SimulationError::invalid(
                "down_payment_grid_pct",
                "Down-payment percentages must lie in [0, 100)",
            ));
        }
        if self.rental_horizons_years.iter().any(|y| *y == 0) {
            return Err(SimulationError::invalid(
                "rental_horizons_years",
                "Horizons must be at least one year",
            ));
        }
        if self.max_term_months == 0 || self.max_term_months > MAX_TERM_MONTHS {
            return Err(SimulationError::invalid(
                "max_term_months",
                format!("Maximum term must lie in [1, {MAX_TERM_MONTHS}] months"),
            ));
        }
        if self.max_annual_rate_pct <= Decimal::ZERO || self.max_annual_rate_pct > MAX_RATE_PCT {
            return Err(SimulationError::invalid(
                "max_annual_rate_pct",
                format!("Maximum rate must lie in (0, {MAX_RATE_PCT}] %"),
            ));
        }
        self.stress.validate()
    }

    /// Reject terms and rates outside the configured envelope.
    pub fn check_loan_bounds(&self, annual_rate_pct: RatePct, term_months: Months) -> SimulationResult<()> {
        if term_months > self.max_term_months {
            return Err(SimulationError::invalid(
                "term_months",
                format!("Term exceeds the {} month maximum", self.max_term_months),
            ));
        }
        if annual_rate_pct > self.max_annual_rate_pct {
            return Err(SimulationError::invalid(
                "annual_rate_pct",
                format!("Rate exceeds the {}% maximum", self.max_annual_rate_pct),
            ));
        }
        Ok(())
    }
}

impl StressPolicy {
    pub fn validate(&self) -> SimulationResult<()> {
        for (field, factor) in [
            ("job_loss_income_factor", self.job_loss_income_factor),
            ("income_drop_factor", self.income_drop_factor),
            ("expense_rise_factor", self.expense_rise_factor),
        ] {
            if factor < Decimal::ZERO || factor > MAX_STRESS_FACTOR {
                return Err(SimulationError::invalid(
                    field,
                    format!("Factor must lie in [0, {MAX_STRESS_FACTOR}]"),
                ));
            }
        }
        if self.high_risk_below_pct > self.medium_risk_below_pct {
            return Err(SimulationError::invalid(
                "high_risk_below_pct",
                "High-risk threshold must not exceed the medium-risk threshold",
            ));
        }
        Ok(())
    }
}

/// Largest multiplier a stress scenario may apply to income or expenses.
pub const MAX_STRESS_FACTOR: Decimal = dec!(10);

pub(crate) fn validate_effort_ratio(field: &str, ratio: Ratio) -> SimulationResult<()> {
    if ratio <= Decimal::ZERO || ratio > Decimal::ONE {
        return Err(SimulationError::invalid(
            field,
            "Effort ratio must lie in (0, 1]",
        ));
    }
    Ok(())
}

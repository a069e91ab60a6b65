use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::SimulationResult;

/// All monetary values, in euros. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Annual rates expressed as percentages (3.5 = 3.5 % per year).
pub type RatePct = Decimal;

/// Periodic rates as decimal fractions (0.0029 = 0.29 % per month).
pub type Rate = Decimal;

/// Ratios in (0, 1], e.g. a 0.33 maximum effort ratio.
pub type Ratio = Decimal;

/// Loan durations, always counted in monthly periods.
pub type Months = u32;

/// Largest amount any calculator accepts, in euros.
pub const MAX_AMOUNT: Money = dec!(1000000000000);

/// Longest loan term any calculator accepts (100 years).
pub const MAX_TERM_MONTHS: Months = 1200;

/// Highest nominal annual rate any calculator accepts.
pub const MAX_RATE_PCT: RatePct = dec!(100);

/// Monthly periodic rate for an annual percentage: pct / 100 / 12.
pub fn monthly_rate(annual_rate_pct: RatePct) -> Rate {
    annual_rate_pct / dec!(100) / dec!(12)
}

/// Round a monetary amount to cents.
pub fn round_money(value: Money) -> Money {
    value.round_dp(2)
}

/// Round a percentage for display (two decimals).
pub fn round_pct(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// `part / whole * 100`, or zero when `whole` is zero. Saturates at
/// `Decimal::MAX`/`MIN` when the quotient leaves the decimal range.
pub fn pct_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|q| q.checked_mul(dec!(100)))
        .unwrap_or(if part.is_sign_negative() == whole.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        })
}

/// Amounts must lie in `[0, MAX_AMOUNT]`.
pub(crate) fn validate_amount(field: &str, value: Money) -> SimulationResult<()> {
    if value < Decimal::ZERO {
        return Err(SimulationError::invalid(field, "Amount cannot be negative"));
    }
    if value > MAX_AMOUNT {
        return Err(SimulationError::invalid(
            field,
            format!("Amount exceeds the {MAX_AMOUNT} ceiling"),
        ));
    }
    Ok(())
}

/// Terms must lie in `[1, MAX_TERM_MONTHS]`.
pub(crate) fn validate_term(field: &str, months: Months) -> SimulationResult<()> {
    if months == 0 {
        return Err(SimulationError::invalid(field, "Loan term must be at least one month"));
    }
    if months > MAX_TERM_MONTHS {
        return Err(SimulationError::invalid(
            field,
            format!("Loan term exceeds {MAX_TERM_MONTHS} months"),
        ));
    }
    Ok(())
}

/// Annual rates must lie in `[0, MAX_RATE_PCT]`.
pub(crate) fn validate_rate(field: &str, annual_rate_pct: RatePct) -> SimulationResult<()> {
    if annual_rate_pct < Decimal::ZERO {
        return Err(SimulationError::invalid(field, "Interest rate cannot be negative"));
    }
    if annual_rate_pct > MAX_RATE_PCT {
        return Err(SimulationError::invalid(
            field,
            format!("Interest rate above {MAX_RATE_PCT}% is not a mortgage rate"),
        ));
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

impl<T: Serialize> ComputationOutput<T> {
    /// Convert the result while keeping methodology, warnings and metadata.
    pub fn map<U: Serialize>(self, f: impl FnOnce(T) -> U) -> ComputationOutput<U> {
        ComputationOutput {
            result: f(self.result),
            methodology: self.methodology,
            assumptions: self.assumptions,
            warnings: self.warnings,
            metadata: self.metadata,
        }
    }
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{self, LoanTerms};
use crate::policy::validate_effort_ratio;
use crate::{SimulationResult, types::*};

/// Marker carried by [`CapacityResult::error`] when no payment room exists.
pub const INSUFFICIENT_INCOME: &str = "insufficient income for given effort ratio";

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Household income and recurring outgoings, per month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeProfile {
    pub net_monthly_income: Money,
    #[serde(default)]
    pub other_monthly_income: Money,
    /// Existing recurring charges. They reduce the residual income but do
    /// not enter the effort ratio.
    #[serde(default)]
    pub monthly_expenses: Money,
    /// Maximum share of income the loan payment may take, in (0, 1].
    pub max_effort_ratio: Ratio,
}

impl IncomeProfile {
    pub fn total_income(&self) -> Money {
        self.net_monthly_income + self.other_monthly_income
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityInput {
    pub income: IncomeProfile,
    pub annual_rate_pct: RatePct,
    pub term_months: Months,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityResult {
    pub max_principal: Money,
    pub max_monthly_payment: Money,
    /// Sum of all instalments (payment * term).
    pub total_cost: Money,
    pub total_interest: Money,
    pub total_income: Money,
    pub effort_ratio_used: Ratio,
    /// Income left after expenses and the loan payment ("reste à vivre").
    pub residual_income: Money,
    /// Set when the inputs leave no room for a payment; every money field is
    /// then zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CapacityResult {
    fn infeasible(total_income: Money, effort_ratio: Ratio) -> Self {
        Self {
            max_principal: Decimal::ZERO,
            max_monthly_payment: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            total_interest: Decimal::ZERO,
            total_income,
            effort_ratio_used: effort_ratio,
            residual_income: Decimal::ZERO,
            error: Some(INSUFFICIENT_INCOME.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size the maximum borrowable principal from income.
///
/// The payment ceiling is `total income * max effort ratio`; the principal is
/// the inverse annuity of that ceiling at the given rate and term.
pub fn compute_capacity(
    input: &CapacityInput,
) -> SimulationResult<ComputationOutput<CapacityResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let total_income = input.income.total_income();
    let ratio = input.income.max_effort_ratio;
    let max_payment = total_income * ratio;

    let output = if max_payment <= Decimal::ZERO {
        tracing::warn!(%total_income, %ratio, "no payment room for capacity sizing");
        warnings.push("Income leaves no room for a loan payment".into());
        CapacityResult::infeasible(total_income, ratio)
    } else {
        let r = monthly_rate(input.annual_rate_pct);
        let max_principal = amortization::principal_from_payment(max_payment, r, input.term_months)?;
        let total_cost = max_payment * Decimal::from(input.term_months);
        let residual_income = total_income - input.income.monthly_expenses - max_payment;

        if residual_income < Decimal::ZERO {
            warnings.push(format!(
                "Expenses of {} leave a negative residual income at the maximum payment",
                input.income.monthly_expenses
            ));
        }
        if ratio > dec!(0.35) {
            warnings.push("Effort ratio above the 35% HCSF recommendation".into());
        }

        CapacityResult {
            max_principal,
            max_monthly_payment: max_payment,
            total_cost,
            total_interest: total_cost - max_principal,
            total_income,
            effort_ratio_used: ratio,
            residual_income,
            error: None,
        }
    };

    tracing::debug!(max_principal = %output.max_principal, "capacity computed");

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "effort_ratio_definition": "payment / (net + other income); expenses excluded",
        "loan": LoanTerms {
            principal: output.max_principal,
            annual_rate_pct: input.annual_rate_pct,
            term_months: input.term_months,
        },
    });

    Ok(with_metadata(
        "Borrowing capacity (inverse annuity on effort-ratio payment ceiling)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &CapacityInput) -> SimulationResult<()> {
    validate_income(&input.income)?;
    validate_rate("annual_rate_pct", input.annual_rate_pct)?;
    validate_term("term_months", input.term_months)
}

pub(crate) fn validate_income(income: &IncomeProfile) -> SimulationResult<()> {
    validate_amount("net_monthly_income", income.net_monthly_income)?;
    validate_amount("other_monthly_income", income.other_monthly_income)?;
    validate_amount("monthly_expenses", income.monthly_expenses)?;
    validate_effort_ratio("max_effort_ratio", income.max_effort_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationError;
    use rust_decimal_macros::dec;

    fn base_input() -> CapacityInput {
        CapacityInput {
            income: IncomeProfile {
                net_monthly_income: dec!(4000),
                other_monthly_income: Decimal::ZERO,
                monthly_expenses: dec!(500),
                max_effort_ratio: dec!(0.33),
            },
            annual_rate_pct: dec!(3.5),
            term_months: 240,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let result = compute_capacity(&base_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.max_monthly_payment, dec!(1320));
        // 1320 * (1 - 1.0029167^-240) / 0.0029167 ≈ 227,602
        assert!(out.max_principal > dec!(227_500) && out.max_principal < dec!(227_700));
        assert_eq!(out.total_cost, dec!(316_800));
        assert_eq!(out.total_interest, out.total_cost - out.max_principal);
        assert_eq!(out.total_income, dec!(4000));
        assert_eq!(out.residual_income, dec!(2180));
        assert!(out.error.is_none());
    }

    #[test]
    fn test_expenses_do_not_reduce_payment_ceiling() {
        let mut input = base_input();
        input.income.monthly_expenses = dec!(1500);
        let result = compute_capacity(&input).unwrap();
        assert_eq!(result.result.max_monthly_payment, dec!(1320));
    }

    #[test]
    fn test_other_income_counts() {
        let mut input = base_input();
        input.income.other_monthly_income = dec!(1000);
        let result = compute_capacity(&input).unwrap();
        assert_eq!(result.result.total_income, dec!(5000));
        assert_eq!(result.result.max_monthly_payment, dec!(1650));
    }

    #[test]
    fn test_round_trip_through_payment() {
        let result = compute_capacity(&base_input()).unwrap();
        let out = &result.result;
        let payment =
            amortization::compute_payment(out.max_principal, monthly_rate(dec!(3.5)), 240).unwrap();
        assert!((payment - out.max_monthly_payment).abs() < dec!(0.01));
    }

    #[test]
    fn test_zero_income_sets_error_marker() {
        let mut input = base_input();
        input.income.net_monthly_income = Decimal::ZERO;
        let result = compute_capacity(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.error.as_deref(), Some(INSUFFICIENT_INCOME));
        assert_eq!(out.max_principal, Decimal::ZERO);
        assert_eq!(out.max_monthly_payment, Decimal::ZERO);
        assert_eq!(out.total_cost, Decimal::ZERO);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_zero_rate_capacity_is_linear() {
        let mut input = base_input();
        input.annual_rate_pct = Decimal::ZERO;
        let result = compute_capacity(&input).unwrap();
        assert_eq!(result.result.max_principal, dec!(1320) * dec!(240));
        assert_eq!(result.result.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_effort_ratio_out_of_range_rejected() {
        let mut input = base_input();
        input.income.max_effort_ratio = dec!(1.2);
        let err = compute_capacity(&input).unwrap_err();
        match err {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "max_effort_ratio"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_income_beyond_ceiling_is_rejected_not_overflowed() {
        let mut input = base_input();
        input.income.net_monthly_income = MAX_AMOUNT * dec!(1000);
        input.annual_rate_pct = Decimal::ZERO;
        input.term_months = 600;
        match compute_capacity(&input).unwrap_err() {
            SimulationError::InvalidInput { field, .. } => assert_eq!(field, "net_monthly_income"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_income_at_ceiling_computes() {
        let mut input = base_input();
        input.income.net_monthly_income = MAX_AMOUNT;
        input.income.other_monthly_income = MAX_AMOUNT;
        input.term_months = 600;
        let out = compute_capacity(&input).unwrap().result;
        assert!(out.max_principal > MAX_AMOUNT);
    }

    #[test]
    fn test_negative_residual_income_warns() {
        let mut input = base_input();
        input.income.monthly_expenses = dec!(3000);
        let result = compute_capacity(&input).unwrap();
        assert!(result.result.residual_income < Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("residual income")));
    }
}
